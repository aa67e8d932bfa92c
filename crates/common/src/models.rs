//! Customer record and request models

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// How the customer collects their order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Picked up at the store counter
    #[default]
    #[serde(rename = "On counter", alias = "on-counter")]
    OnCounter,

    /// Delivered to the customer's address
    #[serde(rename = "Home Delivery", alias = "home-delivery")]
    HomeDelivery,
}

impl Delivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delivery::OnCounter => "On counter",
            Delivery::HomeDelivery => "Home Delivery",
        }
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Delivery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "On counter" | "on-counter" => Ok(Delivery::OnCounter),
            "Home Delivery" | "home-delivery" => Ok(Delivery::HomeDelivery),
            _ => Err(Error::Validation("Invalid delivery option.".to_string())),
        }
    }
}

/// A customer with a pending or completed follow-up reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    /// Unique record identifier
    #[serde(alias = "_id")]
    pub id: String,

    pub name: String,

    /// Ten-digit phone number, also the deduplication key.
    /// Only legacy records stored before validation existed may lack one.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub delivery: Delivery,

    /// Start of the day on which the customer should be contacted
    pub reminder_date: DateTime<Utc>,

    /// Calendar date of the visit (`YYYY-MM-DD`) in the store's timezone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visited_date: Option<String>,

    /// Older files store the raw form input here, e.g. `"450"` or `""`
    #[serde(default, deserialize_with = "lenient_amount")]
    pub bill_amount: f64,

    #[serde(default)]
    pub completed: bool,

    pub created_at: DateTime<Utc>,
}

impl CustomerRecord {
    /// Stored visit date, or the creation day in `tz` for records that predate it
    pub fn visited_date_or_derived(&self, tz: &FixedOffset) -> String {
        match &self.visited_date {
            Some(date) if !date.is_empty() => date.clone(),
            _ => crate::policy::compute_visited_date(self.created_at, tz),
        }
    }

    pub fn contact_str(&self) -> &str {
        self.contact.as_deref().unwrap_or("")
    }

    /// Contact used for grouping; blank contacts count as missing
    pub fn contact_key(&self) -> Option<&str> {
        self.contact.as_deref().filter(|c| !c.trim().is_empty())
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let contact = Option::<Value>::deserialize(deserializer)?;
    Ok(contact
        .as_ref()
        .and_then(|value| crate::policy::parse_contact(value).ok())
        .filter(|c| !c.is_empty()))
}

fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = Option::<Value>::deserialize(deserializer)?;
    Ok(crate::policy::parse_bill_amount(amount.as_ref()).unwrap_or(0.0))
}

/// Fields accepted when creating a customer.
///
/// Contact, delivery and numeric fields are kept as raw JSON so that form
/// strings such as `"30"` and bare numbers are both accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub contact: Value,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub days_until_reminder: Value,

    #[serde(default)]
    pub bill_amount: Option<Value>,

    #[serde(default)]
    pub delivery: Option<Value>,
}

//! Reminder policy: date arithmetic and due/pending classification.
//!
//! All functions take `now` explicitly so callers (and tests) control the clock.

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::CustomerRecord;

/// Asia/Kolkata, the store's timezone for visit stamps
pub const INDIA_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Timezones used when stamping and classifying reminders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// Zone whose midnight a reminder date is normalized to
    pub reminder_tz: FixedOffset,

    /// Zone used for the `visitedDate` calendar stamp
    pub visit_tz: FixedOffset,
}

impl ReminderPolicy {
    pub fn new(reminder_tz: FixedOffset, visit_tz: FixedOffset) -> Self {
        Self {
            reminder_tz,
            visit_tz,
        }
    }

    pub fn reminder_date(&self, now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
        compute_reminder_date(now, days, &self.reminder_tz)
    }

    pub fn visited_date(&self, now: DateTime<Utc>) -> String {
        compute_visited_date(now, &self.visit_tz)
    }

    pub fn is_due(&self, record: &CustomerRecord, as_of: DateTime<Utc>) -> bool {
        is_due(record, as_of, &self.reminder_tz)
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        let india = india_offset();
        Self::new(india, india)
    }
}

pub fn india_offset() -> FixedOffset {
    FixedOffset::east_opt(INDIA_OFFSET_SECS).expect("constant offset is within range")
}

/// `now` shifted by `days` calendar days, at midnight in `tz`.
///
/// Negative offsets are allowed and put the reminder in the past.
pub fn compute_reminder_date(
    now: DateTime<Utc>,
    days: i64,
    tz: &FixedOffset,
) -> Result<DateTime<Utc>> {
    let today = now.with_timezone(tz).date_naive();

    let target = if days >= 0 {
        today.checked_add_days(Days::new(days as u64))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    }
    .ok_or_else(|| Error::Validation("Invalid daysUntilReminder".to_string()))?;

    midnight(target, tz)
}

/// Calendar date (`YYYY-MM-DD`) of `now` in `tz`
pub fn compute_visited_date(now: DateTime<Utc>, tz: &FixedOffset) -> String {
    now.with_timezone(tz).format("%Y-%m-%d").to_string()
}

/// Start of the calendar day containing `instant` in `tz`
pub fn start_of_day(instant: DateTime<Utc>, tz: &FixedOffset) -> Result<DateTime<Utc>> {
    midnight(instant.with_timezone(tz).date_naive(), tz)
}

fn midnight(date: NaiveDate, tz: &FixedOffset) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Validation(format!("No midnight for {date} in {tz}")))
}

/// Pending and scheduled for the day containing `as_of`
pub fn is_due(record: &CustomerRecord, as_of: DateTime<Utc>, tz: &FixedOffset) -> bool {
    if record.completed {
        return false;
    }

    match start_of_day(as_of, tz) {
        Ok(start) => record.reminder_date >= start && record.reminder_date < start + Duration::days(1),
        Err(_) => false,
    }
}

pub fn is_pending(record: &CustomerRecord) -> bool {
    !record.completed
}

/// Contact numbers are exactly ten ASCII digits
pub fn validate_contact(contact: &str) -> Result<()> {
    if contact.len() == 10 && contact.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::Validation(
            "Contact must be a 10-digit number (digits only).".to_string(),
        ))
    }
}

/// Contact as text. Forms send a string; bare JSON integers are accepted too.
pub fn parse_contact(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) if n.is_u64() => Ok(n.to_string()),
        _ => Err(Error::Validation(
            "Contact must be a 10-digit number (digits only).".to_string(),
        )),
    }
}

/// Interpret the `daysUntilReminder` field.
///
/// Integers pass through, finite floats are truncated and strings are read up
/// to the first non-digit (`"7 days"` is 7).
pub fn parse_days(value: &Value) -> Result<i64> {
    let invalid = || Error::Validation("Invalid daysUntilReminder".to_string());

    match value {
        Value::Number(n) => {
            if let Some(days) = n.as_i64() {
                return Ok(days);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(invalid()),
            }
        }
        Value::String(s) => parse_leading_integer(s).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn parse_leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first()? {
        b'-' => ("-", &s[1..]),
        b'+' => ("", &s[1..]),
        _ => ("", s),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    format!("{sign}{digits}").parse().ok()
}

/// Interpret the `billAmount` field; missing means zero
pub fn parse_bill_amount(value: Option<&Value>) -> Result<f64> {
    let invalid = || Error::Validation("Invalid billAmount".to_string());

    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset (or `Z` / `UTC`)
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();
    let invalid = || Error::Validation(format!("Invalid UTC offset: {s}"));

    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

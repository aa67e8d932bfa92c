//! Customer operations on top of a record store

use chrono::{DateTime, Utc};
use reminder_common::policy::{self, ReminderPolicy};
use reminder_common::{export, query, CustomerRecord, Delivery, Error, NewCustomer, Result, ViewQuery};
use std::sync::Arc;
use tracing::{debug, info};
use serde_json::Value;
use uuid::Uuid;

use crate::storage::RecordStore;

pub struct CustomerService {
    store: Arc<dyn RecordStore>,
    policy: ReminderPolicy,
}

impl CustomerService {
    pub fn new(store: Arc<dyn RecordStore>, policy: ReminderPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &ReminderPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Validate and store a new customer, replacing any record with the same contact
    pub async fn create(&self, input: NewCustomer) -> Result<CustomerRecord> {
        self.create_at(input, Utc::now()).await
    }

    pub async fn create_at(&self, input: NewCustomer, now: DateTime<Utc>) -> Result<CustomerRecord> {
        let record = self.build_record(input, now)?;

        let replaced = self.store.replace_by_contact(record.clone()).await?;
        if replaced > 0 {
            info!(
                "Removed {} existing record(s) for contact {}",
                replaced,
                record.contact_str()
            );
        }

        info!(
            "Created customer {} with reminder on {}",
            record.id,
            record.reminder_date.format("%Y-%m-%d")
        );
        Ok(record)
    }

    fn build_record(&self, input: NewCustomer, now: DateTime<Utc>) -> Result<CustomerRecord> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Name is required.".to_string()));
        }

        let contact = policy::parse_contact(&input.contact)?;
        policy::validate_contact(&contact)?;

        // Anything other than a non-empty string falls back to the counter
        let delivery = match input.delivery {
            Some(Value::String(value)) if !value.trim().is_empty() => value.parse()?,
            _ => Delivery::default(),
        };

        let days = policy::parse_days(&input.days_until_reminder)?;
        let bill_amount = policy::parse_bill_amount(input.bill_amount.as_ref())?;

        let address = input
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        Ok(CustomerRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            contact: Some(contact),
            address,
            delivery,
            reminder_date: self.policy.reminder_date(now, days)?,
            visited_date: Some(self.policy.visited_date(now)),
            bill_amount,
            completed: false,
            created_at: now,
        })
    }

    /// Every record, newest first
    pub async fn list_all(&self) -> Result<Vec<CustomerRecord>> {
        let mut records = self.store.list_all().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("Listing {} customers", records.len());
        Ok(records)
    }

    /// Records not yet completed, earliest reminder first
    pub async fn list_pending(&self) -> Result<Vec<CustomerRecord>> {
        self.store.list_pending().await
    }

    /// Pending records whose reminder falls on the day of `as_of`
    pub async fn list_due(&self, as_of: DateTime<Utc>) -> Result<Vec<CustomerRecord>> {
        let pending = self.store.list_pending().await?;
        Ok(pending
            .into_iter()
            .filter(|r| self.policy.is_due(r, as_of))
            .collect())
    }

    pub async fn complete(&self, id: &str) -> Result<CustomerRecord> {
        let record = self
            .store
            .mark_completed(id)
            .await?
            .ok_or_else(|| Error::NotFound("Customer not found".to_string()))?;

        info!("Completed reminder for customer {}", id);
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::NotFound("Customer not found".to_string()));
        }

        info!("Deleted customer {}", id);
        Ok(())
    }

    pub async fn delete_by_contact(&self, contact: &str) -> Result<usize> {
        let removed = self.store.delete_by_contact(contact.trim()).await?;
        info!("Removed {} record(s) for contact {}", removed, contact.trim());
        Ok(removed)
    }

    pub async fn deduplicate(&self) -> Result<usize> {
        let removed = self.store.deduplicate().await?;
        info!("Deduplicate removed {} record(s)", removed);
        Ok(removed)
    }

    /// Filtered and ordered records for display
    pub async fn view(&self, view: &ViewQuery) -> Result<Vec<CustomerRecord>> {
        let records = self.list_all().await?;
        Ok(query::apply_view(&records, view, &self.policy.visit_tz))
    }

    /// The same view rendered as CSV
    pub async fn export(&self, view: &ViewQuery) -> Result<Vec<u8>> {
        let records = self.view(view).await?;
        debug!("Exporting {} customers", records.len());
        export::to_csv(&records, &self.policy.visit_tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::FixedOffset;
    use reminder_common::{SortDirection, SortKey};
    use serde_json::json;

    fn service() -> CustomerService {
        CustomerService::new(Arc::new(MemoryStore::new()), ReminderPolicy::default())
    }

    fn new_customer(name: &str, contact: &str, days: serde_json::Value) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            contact: json!(contact),
            days_until_reminder: days,
            ..Default::default()
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_computes_dates() {
        let service = service();
        let now = at("2026-10-19T06:00:00Z");

        let record = service
            .create_at(new_customer("Asha", "9876543210", json!(30)), now)
            .await
            .unwrap();

        assert_eq!(record.contact.as_deref(), Some("9876543210"));
        assert_eq!(record.reminder_date, at("2026-11-17T18:30:00Z"));
        assert_eq!(record.visited_date.as_deref(), Some("2026-10-19"));
        assert_eq!(record.delivery, Delivery::OnCounter);
        assert_eq!(record.bill_amount, 0.0);
        assert_eq!(record.created_at, now);
        assert!(!record.completed);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_without_storing() {
        let service = service();

        let err = service
            .create(new_customer("Asha", "98765", json!(30)))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let mut bad_delivery = new_customer("Asha", "9876543210", json!(30));
        bad_delivery.delivery = Some(json!("Courier"));
        assert!(service.create(bad_delivery).await.unwrap_err().is_validation());

        let err = service
            .create(new_customer("Asha", "9876543210", json!("soon")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid daysUntilReminder");

        assert!(service
            .create(new_customer("   ", "9876543210", json!(3)))
            .await
            .unwrap_err()
            .is_validation());

        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_numeric_contact_and_non_string_delivery() {
        let service = service();

        let mut input = new_customer("Asha", "", json!(3));
        input.contact = json!(9876543210u64);
        input.delivery = Some(json!(1));

        let record = service.create(input).await.unwrap();
        assert_eq!(record.contact.as_deref(), Some("9876543210"));
        assert_eq!(record.delivery, Delivery::OnCounter);

        let mut home = new_customer("Ravi", "1111111111", json!(3));
        home.delivery = Some(json!(" Home Delivery "));
        assert_eq!(service.create(home).await.unwrap().delivery, Delivery::HomeDelivery);
    }

    #[tokio::test]
    async fn test_second_create_for_contact_wins() {
        let service = service();

        service
            .create_at(new_customer("First", "9876543210", json!(5)), at("2026-10-01T06:00:00Z"))
            .await
            .unwrap();
        service
            .create_at(new_customer("Second", "9876543210", json!(5)), at("2026-10-02T06:00:00Z"))
            .await
            .unwrap();

        let all = service.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Second");
    }

    #[tokio::test]
    async fn test_complete_unknown_id_is_not_found() {
        let service = service();
        assert!(service.complete("nope").await.unwrap_err().is_not_found());
        assert!(service.delete("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_completed_record_leaves_pending() {
        let service = service();
        let record = service
            .create(new_customer("Asha", "9876543210", json!(1)))
            .await
            .unwrap();

        assert_eq!(service.list_pending().await.unwrap().len(), 1);
        let completed = service.complete(&record.id).await.unwrap();
        assert!(completed.completed);
        assert!(service.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_due_only_today() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let service = CustomerService::new(Arc::new(MemoryStore::new()), ReminderPolicy::new(utc, utc));
        let now = at("2026-10-19T09:00:00Z");

        service
            .create_at(new_customer("Today", "1111111111", json!(0)), now)
            .await
            .unwrap();
        service
            .create_at(new_customer("Tomorrow", "2222222222", json!(1)), now)
            .await
            .unwrap();
        service
            .create_at(new_customer("Overdue", "3333333333", json!(-1)), now)
            .await
            .unwrap();

        let due = service.list_due(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Today");

        // Pending is the broader set
        assert_eq!(service.list_pending().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_view_and_export_follow_query() {
        let service = service();
        for (name, contact, bill) in [("Zed", "1111111111", 50), ("Amy", "2222222222", 5), ("Bob", "3333333333", 100)] {
            let mut input = new_customer(name, contact, json!(10));
            input.bill_amount = Some(json!(bill));
            service.create(input).await.unwrap();
        }

        let view = ViewQuery::new(None, SortKey::BillAmount, SortDirection::Asc);
        let names: Vec<String> = service.view(&view).await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Amy", "Zed", "Bob"]);

        let csv = String::from_utf8(service.export(&view).await.unwrap()).unwrap();
        let first_column: Vec<&str> = csv
            .lines()
            .map(|line| line.split(',').next().unwrap_or(""))
            .collect();
        assert_eq!(first_column, vec!["Name", "Amy", "Zed", "Bob"]);
    }
}

//! In-process record store

use async_trait::async_trait;
use reminder_common::{CustomerRecord, Result};
use tokio::sync::Mutex;
use tracing::debug;

use super::{list_ops, RecordStore};

/// Records held in memory; used for tests and throwaway runs
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CustomerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records, e.g. to seed tests with duplicates
    pub fn with_records(records: Vec<CustomerRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn replace_by_contact(&self, record: CustomerRecord) -> Result<usize> {
        let mut records = self.records.lock().await;
        Ok(list_ops::replace_by_contact(&mut records, record))
    }

    async fn list_all(&self) -> Result<Vec<CustomerRecord>> {
        let records = self.records.lock().await;
        debug!("Listing {} in-memory records", records.len());
        Ok(records.clone())
    }

    async fn mark_completed(&self, id: &str) -> Result<Option<CustomerRecord>> {
        let mut records = self.records.lock().await;
        Ok(list_ops::mark_completed(&mut records, id))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.lock().await;
        Ok(list_ops::delete(&mut records, id))
    }

    async fn delete_by_contact(&self, contact: &str) -> Result<usize> {
        let mut records = self.records.lock().await;
        Ok(list_ops::delete_by_contact(&mut records, contact))
    }

    async fn deduplicate(&self) -> Result<usize> {
        let mut records = self.records.lock().await;
        Ok(list_ops::deduplicate(&mut records))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{at, record};

    #[tokio::test]
    async fn test_replace_by_contact_keeps_one_record() {
        let store = MemoryStore::new();

        let first = record("first", Some("9876543210"), "2026-10-01T00:00:00Z");
        let second = record("second", Some("9876543210"), "2026-10-02T00:00:00Z");

        assert_eq!(store.replace_by_contact(first).await.unwrap(), 0);
        assert_eq!(store.replace_by_contact(second).await.unwrap(), 1);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "second");
    }

    #[tokio::test]
    async fn test_list_pending_excludes_completed_and_orders_by_reminder() {
        let mut late = record("late", Some("1111111111"), "2026-10-01T00:00:00Z");
        late.reminder_date = at("2026-12-01T00:00:00Z");
        let mut early = record("early", Some("2222222222"), "2026-10-01T00:00:00Z");
        early.reminder_date = at("2026-11-01T00:00:00Z");
        let mut done = record("done", Some("3333333333"), "2026-10-01T00:00:00Z");
        done.completed = true;

        let store = MemoryStore::with_records(vec![late, done, early]);
        let pending = store.list_pending().await.unwrap();

        let ids: Vec<&str> = pending.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_mark_completed_and_delete() {
        let store = MemoryStore::with_records(vec![record("a", Some("1111111111"), "2026-10-01T00:00:00Z")]);

        assert!(store.mark_completed("missing").await.unwrap().is_none());
        let updated = store.mark_completed("a").await.unwrap().unwrap();
        assert!(updated.completed);
        assert!(store.list_pending().await.unwrap().is_empty());

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_contact_is_idempotent() {
        let store = MemoryStore::with_records(vec![
            record("a", Some("1111111111"), "2026-10-01T00:00:00Z"),
            record("b", Some("1111111111"), "2026-10-02T00:00:00Z"),
            record("c", Some("2222222222"), "2026-10-02T00:00:00Z"),
        ]);

        assert_eq!(store.delete_by_contact("1111111111").await.unwrap(), 2);
        assert_eq!(store.delete_by_contact("1111111111").await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deduplicate_keeps_contactless_records() {
        let store = MemoryStore::with_records(vec![
            record("old", Some("1111111111"), "2026-10-01T00:00:00Z"),
            record("anon-1", None, "2026-10-01T00:00:00Z"),
            record("new", Some("1111111111"), "2026-10-05T00:00:00Z"),
            record("anon-2", None, "2026-10-01T00:00:00Z"),
        ]);

        assert_eq!(store.deduplicate().await.unwrap(), 1);
        assert_eq!(store.deduplicate().await.unwrap(), 0);

        let ids: Vec<String> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["anon-1", "new", "anon-2"]);
    }
}

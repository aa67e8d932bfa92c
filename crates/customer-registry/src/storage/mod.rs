//! Record store abstraction and its backends.
//!
//! Every backend enforces "latest wins" per contact through a single
//! `replace_by_contact` primitive, so a create never leaves two records
//! with the same contact behind.

mod file;
mod memory;
mod redis_store;

pub use self::file::JsonFileStore;
pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use async_trait::async_trait;
use reminder_common::{policy, CustomerRecord, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Which backend to persist customer records in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory only, lost on restart
    Memory,

    /// Single JSON array file, rewritten on each mutation
    File(PathBuf),

    /// Redis server URL
    Redis(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Remove every record sharing `record`'s contact and insert `record`,
    /// as one atomic step. Returns how many records were replaced.
    async fn replace_by_contact(&self, record: CustomerRecord) -> Result<usize>;

    /// All records in storage order
    async fn list_all(&self) -> Result<Vec<CustomerRecord>>;

    /// Records not yet completed, earliest reminder first
    async fn list_pending(&self) -> Result<Vec<CustomerRecord>> {
        let mut pending: Vec<CustomerRecord> = self
            .list_all()
            .await?
            .into_iter()
            .filter(policy::is_pending)
            .collect();
        sort_by_reminder(&mut pending);
        Ok(pending)
    }

    /// Set `completed`; `None` if no record has this id
    async fn mark_completed(&self, id: &str) -> Result<Option<CustomerRecord>>;

    /// Returns false if no record has this id
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Remove all records with this contact
    async fn delete_by_contact(&self, contact: &str) -> Result<usize>;

    /// Keep only the newest record per contact; returns how many were removed
    async fn deduplicate(&self) -> Result<usize>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// Open the configured backend
pub async fn open(backend: &StoreBackend) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File(path) => Arc::new(JsonFileStore::open(path).await?),
        StoreBackend::Redis(url) => Arc::new(RedisStore::new(url).await?),
    };
    Ok(store)
}

pub(crate) fn sort_by_reminder(records: &mut [CustomerRecord]) {
    records.sort_by(|a, b| a.reminder_date.cmp(&b.reminder_date));
}

/// For each record, whether it survives deduplication.
///
/// Within a contact group the latest `created_at` wins; on a tie the record
/// stored first wins. Records without a contact (or with a blank one)
/// always survive.
pub(crate) fn dedup_keep_mask(records: &[CustomerRecord]) -> Vec<bool> {
    let mut newest: HashMap<&str, usize> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        let Some(contact) = record.contact_key() else {
            continue;
        };

        newest
            .entry(contact)
            .and_modify(|kept| {
                if record.created_at > records[*kept].created_at {
                    *kept = idx;
                }
            })
            .or_insert(idx);
    }

    records
        .iter()
        .enumerate()
        .map(|(idx, record)| match record.contact_key() {
            Some(contact) => newest.get(contact) == Some(&idx),
            None => true,
        })
        .collect()
}

/// In-place helpers shared by the list-backed stores
pub(crate) mod list_ops {
    use super::dedup_keep_mask;
    use reminder_common::CustomerRecord;

    pub fn replace_by_contact(records: &mut Vec<CustomerRecord>, record: CustomerRecord) -> usize {
        let removed = match record.contact_key() {
            Some(contact) => delete_by_contact(records, contact),
            None => 0,
        };
        records.push(record);
        removed
    }

    pub fn delete_by_contact(records: &mut Vec<CustomerRecord>, contact: &str) -> usize {
        let before = records.len();
        records.retain(|r| r.contact_key() != Some(contact));
        before - records.len()
    }

    pub fn mark_completed(records: &mut [CustomerRecord], id: &str) -> Option<CustomerRecord> {
        let record = records.iter_mut().find(|r| r.id == id)?;
        record.completed = true;
        Some(record.clone())
    }

    pub fn delete(records: &mut Vec<CustomerRecord>, id: &str) -> bool {
        match records.iter().position(|r| r.id == id) {
            Some(idx) => {
                records.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn deduplicate(records: &mut Vec<CustomerRecord>) -> usize {
        let keep = dedup_keep_mask(records);
        let before = records.len();
        let mut flags = keep.into_iter();
        records.retain(|_| flags.next().unwrap_or(true));
        before - records.len()
    }
}

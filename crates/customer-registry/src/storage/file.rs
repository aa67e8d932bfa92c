//! Flat-file record store: one JSON array, rewritten on every change

use async_trait::async_trait;
use reminder_common::{CustomerRecord, Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{list_ops, RecordStore};

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty array file if needed
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let store = Self {
            path,
            lock: Mutex::new(()),
        };

        if fs::try_exists(&store.path).await? {
            // Fail at startup rather than on the first request
            let count = store.load().await?.len();
            info!("Opened {} with {} records", store.path.display(), count);
        } else {
            store.persist(&[]).await?;
            info!("Created empty record file at {}", store.path.display());
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<CustomerRecord>> {
        let bytes = fs::read(&self.path).await.map_err(|e| {
            Error::Storage(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Storage(format!("Corrupt record file {}: {}", self.path.display(), e))
        })
    }

    async fn persist(&self, records: &[CustomerRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;

        // Rename over the old file so readers never see a partial write
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(|e| {
            Error::Storage(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Load, apply `f`, and write back if it reports a change
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<CustomerRecord>) -> (T, bool) + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let (out, changed) = f(&mut records);
        if changed {
            self.persist(&records).await?;
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn replace_by_contact(&self, record: CustomerRecord) -> Result<usize> {
        self.mutate(|records| (list_ops::replace_by_contact(records, record), true))
            .await
    }

    async fn list_all(&self) -> Result<Vec<CustomerRecord>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn mark_completed(&self, id: &str) -> Result<Option<CustomerRecord>> {
        self.mutate(|records| {
            let updated = list_ops::mark_completed(records, id);
            let changed = updated.is_some();
            (updated, changed)
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.mutate(|records| {
            let deleted = list_ops::delete(records, id);
            (deleted, deleted)
        })
        .await
    }

    async fn delete_by_contact(&self, contact: &str) -> Result<usize> {
        self.mutate(|records| {
            let removed = list_ops::delete_by_contact(records, contact);
            (removed, removed > 0)
        })
        .await
    }

    async fn deduplicate(&self) -> Result<usize> {
        self.mutate(|records| {
            let removed = list_ops::deduplicate(records);
            (removed, removed > 0)
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::record;

    #[tokio::test]
    async fn test_open_creates_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("customers.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "[]");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customers.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store
                .replace_by_contact(record("a", Some("1111111111"), "2026-10-01T00:00:00Z"))
                .await
                .unwrap();
            store
                .replace_by_contact(record("b", Some("2222222222"), "2026-10-02T00:00:00Z"))
                .await
                .unwrap();
            store.mark_completed("a").await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].completed);

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");
    }

    #[tokio::test]
    async fn test_replace_and_deduplicate_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("customers.json")).await.unwrap();

        store
            .replace_by_contact(record("a", Some("1111111111"), "2026-10-01T00:00:00Z"))
            .await
            .unwrap();
        let replaced = store
            .replace_by_contact(record("b", Some("1111111111"), "2026-10-02T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(replaced, 1);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "b");

        assert_eq!(store.deduplicate().await.unwrap(), 0);
        assert!(store.delete("b").await.unwrap());
        assert!(!store.delete("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_reads_legacy_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"[
  {"_id": "1", "name": "A", "contact": "9876543210", "reminderDate": "2024-12-20T00:00:00.000Z", "billAmount": 10, "completed": false, "createdAt": "2024-12-10T10:00:00.000Z"},
  {"_id": "2", "name": "B", "contact": "9876543210", "reminderDate": "2024-12-21T00:00:00.000Z", "completed": false, "createdAt": "2024-12-11T10:00:00.000Z"}
]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.deduplicate().await.unwrap(), 1);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "2");
    }

    #[tokio::test]
    async fn test_reads_form_string_bill_amounts_and_blank_contacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"[
  {"_id": "1", "name": "A", "contact": "9876543210", "address": "", "delivery": "On counter", "reminderDate": "2024-12-20T00:00:00.000Z", "visitedDate": "2024-12-10", "billAmount": "450", "completed": false, "createdAt": "2024-12-10T10:00:00.000Z"},
  {"_id": "2", "name": "B", "contact": "", "delivery": "Home Delivery", "reminderDate": "2024-12-21T00:00:00.000Z", "billAmount": "", "completed": false, "createdAt": "2024-12-11T10:00:00.000Z"},
  {"_id": "3", "name": "C", "contact": "", "reminderDate": "2024-12-22T00:00:00.000Z", "billAmount": "", "completed": true, "createdAt": "2024-12-12T10:00:00.000Z"}
]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].bill_amount, 450.0);
        assert_eq!(all[1].bill_amount, 0.0);
        assert_eq!(all[1].contact, None);

        // Records without a usable contact are never merged
        assert_eq!(store.deduplicate().await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customers.json");
        std::fs::write(&path, "{ not json").unwrap();

        match JsonFileStore::open(&path).await {
            Err(Error::Storage(msg)) => assert!(msg.contains("Corrupt record file")),
            other => panic!("expected storage error, got {:?}", other.map(|s| s.path().to_path_buf())),
        }
    }
}

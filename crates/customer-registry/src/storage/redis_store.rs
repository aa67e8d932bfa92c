//! Redis storage for customer records

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use reminder_common::{CustomerRecord, Error, Result};
use tracing::{debug, info};

use super::{dedup_keep_mask, RecordStore};

/// Removes every id filed under the contact set, then stores the new record.
/// Runs server-side so no other client can interleave.
const REPLACE_BY_CONTACT: &str = r#"
local old = redis.call('SMEMBERS', KEYS[2])
for _, id in ipairs(old) do
    redis.call('DEL', ARGV[1] .. id)
    redis.call('SREM', KEYS[1], id)
end
redis.call('DEL', KEYS[2])
redis.call('SET', ARGV[1] .. ARGV[2], ARGV[3])
redis.call('SADD', KEYS[1], ARGV[2])
redis.call('SADD', KEYS[2], ARGV[2])
return #old
"#;

fn redis_err(e: redis::RedisError) -> Error {
    Error::Redis(e.to_string())
}

/// Storage backend for customer records
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::with_prefix(redis_url, "reminders").await
    }

    /// Keep all keys under `prefix:` so several stores can share a database
    pub async fn with_prefix(redis_url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(redis_err)?;
        let conn = ConnectionManager::new(client).await.map_err(redis_err)?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    fn record_prefix(&self) -> String {
        format!("{}:customer:", self.prefix)
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:customer:{}", self.prefix, id)
    }

    fn index_key(&self) -> String {
        format!("{}:customers:all", self.prefix)
    }

    fn contact_key(&self, contact: &str) -> String {
        format!("{}:contact:{}", self.prefix, contact)
    }

    async fn get_record(&self, id: &str) -> Result<Option<CustomerRecord>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(self.record_key(id)).await.map_err(redis_err)?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Drop records and their index entries in one MULTI/EXEC
    async fn remove_records(&self, records: &[&CustomerRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for record in records {
            pipe.del(self.record_key(&record.id)).ignore();
            pipe.srem(self.index_key(), &record.id).ignore();
            if let Some(contact) = record.contact_key() {
                pipe.srem(self.contact_key(contact), &record.id).ignore();
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(redis_err)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn replace_by_contact(&self, record: CustomerRecord) -> Result<usize> {
        let json = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();

        let replaced = match record.contact_key() {
            Some(contact) => {
                let script = redis::Script::new(REPLACE_BY_CONTACT);
                let mut invocation = script.prepare_invoke();
                invocation
                    .key(self.index_key())
                    .key(self.contact_key(contact))
                    .arg(self.record_prefix())
                    .arg(&record.id)
                    .arg(&json);
                invocation
                    .invoke_async::<_, usize>(&mut conn)
                    .await
                    .map_err(redis_err)?
            }
            None => {
                let mut pipe = redis::pipe();
                pipe.atomic()
                    .set(self.record_key(&record.id), &json)
                    .ignore()
                    .sadd(self.index_key(), &record.id)
                    .ignore();
                let _: () = pipe.query_async(&mut conn).await.map_err(redis_err)?;
                0
            }
        };

        info!("Stored customer {} (replaced {})", record.id, replaced);
        Ok(replaced)
    }

    async fn list_all(&self) -> Result<Vec<CustomerRecord>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(self.index_key()).await.map_err(redis_err)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.record_key(id)).collect();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;

        let mut records = Vec::with_capacity(values.len());
        for data in values.into_iter().flatten() {
            records.push(serde_json::from_str::<CustomerRecord>(&data)?);
        }

        // Sets are unordered; creation order stands in for insertion order
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        debug!("Loaded {} records from Redis", records.len());
        Ok(records)
    }

    async fn mark_completed(&self, id: &str) -> Result<Option<CustomerRecord>> {
        let Some(mut record) = self.get_record(id).await? else {
            return Ok(None);
        };

        record.completed = true;
        let json = serde_json::to_string(&record)?;

        // XX: a record deleted or replaced since the read stays gone
        let mut conn = self.conn.clone();
        let stored: Option<String> = redis::cmd("SET")
            .arg(self.record_key(id))
            .arg(json)
            .arg("XX")
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        if stored.is_none() {
            debug!("Customer {} vanished before completion", id);
            return Ok(None);
        }

        info!("Marked customer {} completed", id);
        Ok(Some(record))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        match self.get_record(id).await? {
            Some(record) => {
                self.remove_records(&[&record]).await?;
                info!("Deleted customer {}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_contact(&self, contact: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .smembers(self.contact_key(contact))
            .await
            .map_err(redis_err)?;

        if ids.is_empty() {
            return Ok(0);
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for id in &ids {
            pipe.del(self.record_key(id)).ignore();
            pipe.srem(self.index_key(), id).ignore();
        }
        pipe.del(self.contact_key(contact)).ignore();
        let _: () = pipe.query_async(&mut conn).await.map_err(redis_err)?;

        info!("Deleted {} record(s) for contact {}", ids.len(), contact);
        Ok(ids.len())
    }

    async fn deduplicate(&self) -> Result<usize> {
        let records = self.list_all().await?;
        let keep = dedup_keep_mask(&records);

        let doomed: Vec<&CustomerRecord> = records
            .iter()
            .zip(keep)
            .filter_map(|(record, keep)| (!keep).then_some(record))
            .collect();

        self.remove_records(&doomed).await?;
        info!("Deduplicate removed {} record(s)", doomed.len());
        Ok(doomed.len())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

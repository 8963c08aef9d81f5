//! Generic TTL-bounded cache collection.
//!
//! Values are stored as JSON and replaced wholesale on every `put`. An entry
//! is readable while `now - created_at < ttl`; an expired entry is deleted by
//! the read that notices it. There is no background sweep.

use super::Store;
use crate::config::StoreConfig;
use crate::error::Result;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// A raw cache row.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Access to the `cache` collection.
#[derive(Debug, Clone)]
pub struct CacheRepository {
    store: Store,
    ttl: Duration,
}

impl CacheRepository {
    pub(crate) fn new(store: Store) -> Self {
        Self {
            store,
            ttl: StoreConfig::CACHE_TTL,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - created_at).to_std() {
            Ok(age) => age >= self.ttl,
            // Written "in the future" (clock moved back): still fresh
            Err(_) => false,
        }
    }

    /// Read a live entry, deleting it if it has expired.
    pub fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row: Option<(String, i64)> = self.store.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value, created_at_ms FROM cache WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        })?;

        let Some((raw, created_ms)) = row else {
            return Ok(None);
        };
        let created_at = Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        if self.is_expired(created_at, self.store.now()) {
            debug!("Cache entry '{}' expired", key);
            if let Err(e) = self.delete(key) {
                warn!("Failed to delete expired cache entry '{}': {}", key, e);
            }
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            key: key.to_string(),
            value: serde_json::from_str(&raw)?,
            created_at,
        }))
    }

    /// Read and deserialize a live entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_entry(key)? {
            Some(entry) => Ok(Some(serde_json::from_value(entry.value)?)),
            None => Ok(None),
        }
    }

    /// Write an entry, replacing any previous value and restarting its TTL.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        let created_ms = self.store.now().timestamp_millis();
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cache (key, value, created_at_ms) VALUES (?1, ?2, ?3)",
                params![key, raw, created_ms],
            )?;
            Ok(())
        })?;
        debug!("Cached '{}' ({} bytes)", key, raw.len());
        Ok(())
    }

    /// Delete an entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let deleted = self.store.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?)
        })?;
        Ok(deleted > 0)
    }

    /// Delete every expired entry now. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.store.now().timestamp_millis().saturating_sub(ttl_ms);
        let deleted = self.store.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM cache WHERE created_at_ms <= ?1",
                params![cutoff],
            )?)
        })?;
        if deleted > 0 {
            debug!("Purged {} expired cache entries", deleted);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ManualClock, StoreLocation};
    use serde::Deserialize;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    fn setup() -> (ManualClock, Store) {
        let clock = ManualClock::default();
        let store = Store::open_with(StoreLocation::Memory, Arc::new(clock.clone())).unwrap();
        (clock, store)
    }

    fn row_exists(store: &Store, key: &str) -> bool {
        store
            .with_conn(|conn| {
                Ok(conn
                    .query_row("SELECT 1 FROM cache WHERE key = ?1", params![key], |_| Ok(()))
                    .optional()?
                    .is_some())
            })
            .unwrap()
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[test]
    fn test_put_and_get() {
        let (_clock, store) = setup();
        let cache = store.cache();
        let payload = Payload {
            name: "shirt".into(),
            count: 2,
        };
        cache.put("k", &payload).unwrap();
        assert_eq!(cache.get::<Payload>("k").unwrap(), Some(payload));
        assert_eq!(cache.get::<Payload>("missing").unwrap(), None);
    }

    #[test]
    fn test_entry_is_live_just_before_ttl() {
        let (clock, store) = setup();
        let cache = store.cache();
        cache.put("k", &1).unwrap();
        clock.advance(23 * HOUR);
        assert_eq!(cache.get::<i32>("k").unwrap(), Some(1));
    }

    #[test]
    fn test_expired_entry_is_absent_and_deleted() {
        let (clock, store) = setup();
        let cache = store.cache();
        cache.put("k", &"value").unwrap();

        clock.advance(25 * HOUR);
        assert!(row_exists(&store, "k"));
        assert_eq!(cache.get::<String>("k").unwrap(), None);
        assert!(!row_exists(&store, "k"));
        assert_eq!(cache.get::<String>("k").unwrap(), None);
    }

    #[test]
    fn test_put_restarts_ttl() {
        let (clock, store) = setup();
        let cache = store.cache();
        cache.put("k", &1).unwrap();
        clock.advance(20 * HOUR);
        cache.put("k", &2).unwrap();
        clock.advance(20 * HOUR);

        let entry = cache.get_entry("k").unwrap().unwrap();
        assert_eq!(entry.value, serde_json::json!(2));
    }

    #[test]
    fn test_purge_expired() {
        let (clock, store) = setup();
        let cache = store.cache();
        cache.put("old", &1).unwrap();
        clock.advance(12 * HOUR);
        cache.put("new", &2).unwrap();
        clock.advance(13 * HOUR);

        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert!(!row_exists(&store, "old"));
        assert!(row_exists(&store, "new"));
    }

    #[test]
    fn test_delete() {
        let (_clock, store) = setup();
        let cache = store.cache();
        cache.put("k", &true).unwrap();
        assert!(cache.delete("k").unwrap());
        assert!(!cache.delete("k").unwrap());
    }
}

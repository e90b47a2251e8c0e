//! Expiring cache store backed by a local libSQL database.
//!
//! [`CacheStore`] is a key/value namespace with per-entry write timestamps.
//! It deliberately does *not* judge freshness: callers check
//! [`CacheEntry::is_stale`] themselves, so a stale entry can still serve as
//! an explicit fallback when a refetch fails.
//!
//! **Failure policy:**
//! - `get` fails soft: a malformed stored value is evicted and read as a miss.
//! - `put` fails soft at the call site: callers treat a rejected write
//!   (oversize value, db error) as a warning, never as a run failure.

mod migrations;

use std::path::Path;

use libsql::{Connection, Database, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use rosterlens_shared::{CacheEntry, Result, RosterLensError, now_ms};

/// Ceiling on a single cached value, mirroring the practical size limits of
/// browser-local storage. Writes above this are rejected.
const MAX_VALUE_BYTES: usize = 1024 * 1024;

/// Primary cache handle wrapping a libSQL database.
pub struct CacheStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl CacheStore {
    /// Open or create a cache database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RosterLensError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| RosterLensError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| RosterLensError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    RosterLensError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Raw key/value operations
    // -----------------------------------------------------------------------

    /// Read the raw JSON value stored under `key`, with its write timestamp.
    pub async fn get_json(&self, key: &str) -> Result<Option<(String, i64)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value_json, stored_at_ms FROM roster_cache WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| RosterLensError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| RosterLensError::Storage(e.to_string()))?;
                let stored_at: i64 = row
                    .get(1)
                    .map_err(|e| RosterLensError::Storage(e.to_string()))?;
                Ok(Some((value, stored_at)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(RosterLensError::Storage(e.to_string())),
        }
    }

    /// Store a raw JSON value under `key` with the given write timestamp.
    ///
    /// An existing entry is only overwritten by a strictly newer timestamp,
    /// so a delayed late write can never roll the cache backwards.
    pub async fn put_json(&self, key: &str, value_json: &str, stored_at_ms: i64) -> Result<()> {
        if value_json.len() > MAX_VALUE_BYTES {
            return Err(RosterLensError::Storage(format!(
                "value for key {key} is {} bytes, over the {MAX_VALUE_BYTES} byte ceiling",
                value_json.len()
            )));
        }

        self.conn
            .execute(
                "INSERT INTO roster_cache (key, value_json, stored_at_ms)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                   value_json = excluded.value_json,
                   stored_at_ms = excluded.stored_at_ms
                 WHERE excluded.stored_at_ms > roster_cache.stored_at_ms",
                params![key, value_json, stored_at_ms],
            )
            .await
            .map_err(|e| RosterLensError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Remove a single key.
    pub async fn evict(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM roster_cache WHERE key = ?1", params![key])
            .await
            .map_err(|e| RosterLensError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Remove every cached entry.
    pub async fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM roster_cache", params![])
            .await
            .map_err(|e| RosterLensError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Number of entries currently stored.
    pub async fn entry_count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM roster_cache", params![])
            .await
            .map_err(|e| RosterLensError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<u64>(0)
                .map_err(|e| RosterLensError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(RosterLensError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Typed entry operations
    // -----------------------------------------------------------------------

    /// Read a typed [`CacheEntry`] under `key`.
    ///
    /// A value that fails to deserialize is evicted and reported as a miss;
    /// corruption never propagates to the caller.
    pub async fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
        let Some((value_json, _)) = self.get_json(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry<T>>(&value_json) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                let err = RosterLensError::CacheCorrupt { key: key.into() };
                tracing::warn!(%err, error = %e, "evicting corrupt cache entry");
                self.evict(key).await?;
                Ok(None)
            }
        }
    }

    /// Store `data` under `key` as a [`CacheEntry`] timestamped now.
    pub async fn put_entry<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let entry = CacheEntry {
            data,
            timestamp: now_ms(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| RosterLensError::Storage(format!("serialize entry for {key}: {e}")))?;
        self.put_json(key, &json, entry.timestamp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterlens_shared::{CACHE_TTL_MS, PlayerRecord};
    use std::collections::HashMap;

    /// Create a temp file store for testing.
    async fn test_store() -> CacheStore {
        let tmp = std::env::temp_dir().join(format!(
            "rosterlens_test_{}_{}.db",
            std::process::id(),
            now_ms()
        ));
        let _ = std::fs::remove_file(&tmp);
        CacheStore::open(&tmp).await.expect("open test db")
    }

    fn sample_lookup() -> HashMap<String, PlayerRecord> {
        let mut lookup = HashMap::new();
        lookup.insert(
            "991".to_string(),
            PlayerRecord {
                id: "991".into(),
                number: "17".into(),
                position: "D".into(),
                grade: "11".into(),
                team_name: Some("Ridgeview Wolves".into()),
                team_id: Some("42".into()),
            },
        );
        lookup
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.schema_version().await, 1);
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn entry_roundtrip() {
        let store = test_store().await;
        let lookup = sample_lookup();

        store
            .put_entry("league:867530", &lookup)
            .await
            .expect("put entry");

        let entry: CacheEntry<HashMap<String, PlayerRecord>> = store
            .get_entry("league:867530")
            .await
            .expect("get entry")
            .expect("entry present");

        assert_eq!(entry.data, lookup);
        // Written just now, so well within the TTL.
        assert!(!entry.is_stale(now_ms(), CACHE_TTL_MS));
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let store = test_store().await;
        let entry: Option<CacheEntry<String>> = store.get_entry("absent").await.unwrap();
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_evicted_as_miss() {
        let store = test_store().await;
        store
            .put_json("league:1", "this is not json", now_ms())
            .await
            .unwrap();

        let entry: Option<CacheEntry<String>> = store.get_entry("league:1").await.unwrap();
        assert!(entry.is_none());
        // The corrupt key is gone entirely.
        assert!(store.get_json("league:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversize_value_rejected() {
        let store = test_store().await;
        let huge = "x".repeat(MAX_VALUE_BYTES + 1);
        let result = store.put_json("big", &huge, now_ms()).await;
        assert!(matches!(result, Err(RosterLensError::Storage(_))));
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn older_write_does_not_overwrite() {
        let store = test_store().await;
        store.put_json("k", r#"{"v":"new"}"#, 2_000).await.unwrap();
        store.put_json("k", r#"{"v":"old"}"#, 1_000).await.unwrap();

        let (value, stored_at) = store.get_json("k").await.unwrap().unwrap();
        assert_eq!(stored_at, 2_000);
        assert!(value.contains("new"));
    }

    #[tokio::test]
    async fn evict_and_clear() {
        let store = test_store().await;
        store.put_json("a", "{}", 1).await.unwrap();
        store.put_json("b", "{}", 1).await.unwrap();
        assert_eq!(store.entry_count().await.unwrap(), 2);

        store.evict("a").await.unwrap();
        assert_eq!(store.entry_count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }
}

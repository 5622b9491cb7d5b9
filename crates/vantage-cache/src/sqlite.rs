//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};
use vantage_core::{CacheKey, ResponseCache, Result, VantageError};

/// SQLite-based cache for provider responses.
///
/// This cache stores payloads in a SQLite database file, providing persistence
/// across application restarts. Expiry is stored as UTC epoch milliseconds.
/// Writes use `INSERT OR REPLACE`, so a reader never sees a partial entry.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| VantageError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| VantageError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS response_cache (
                key TEXT PRIMARY KEY NOT NULL,
                payload_json TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| VantageError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_response_cache_expires_at
             ON response_cache(expires_at)",
            [],
        )
        .map_err(|e| VantageError::Cache(e.to_string()))?;

        debug!("SQLite cache schema initialized");
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VantageError::Cache(e.to_string()))
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl ResponseCache for SqliteCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let conn = self.lock()?;

        let row: Option<String> = conn
            .query_row(
                "SELECT payload_json FROM response_cache
                 WHERE key = ?1 AND expires_at > ?2",
                params![key.as_str(), Self::now_millis()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| VantageError::Cache(e.to_string()))?;

        match row {
            Some(json) => {
                debug!("Cache hit");
                let payload =
                    serde_json::from_str(&json).map_err(|e| VantageError::Cache(e.to_string()))?;
                Ok(Some(payload))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(key = %key, ttl_secs = ttl.as_secs()))]
    async fn put(&self, key: &CacheKey, payload: &Value, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(payload).map_err(|e| VantageError::Cache(e.to_string()))?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Self::now_millis().saturating_add(ttl_ms);

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO response_cache (key, payload_json, expires_at)
             VALUES (?1, ?2, ?3)",
            params![key.as_str(), json, expires_at],
        )
        .map_err(|e| VantageError::Cache(e.to_string()))?;

        debug!("Cached payload");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM response_cache WHERE key = ?1",
                params![key.as_str()],
            )
            .map_err(|e| VantageError::Cache(e.to_string()))?;
        Ok(removed > 0)
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM response_cache WHERE expires_at <= ?1",
                params![Self::now_millis()],
            )
            .map_err(|e| VantageError::Cache(e.to_string()))?;

        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM response_cache", [])
            .map_err(|e| VantageError::Cache(e.to_string()))?;

        debug!("Cleared all cache entries");
        Ok(())
    }
}

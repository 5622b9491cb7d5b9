//! Redis-based cache implementation.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument};
use vantage_core::{CacheKey, ResponseCache, Result, VantageError};

/// Default key namespace.
pub const DEFAULT_KEY_PREFIX: &str = "vantage";

const KEY_SEPARATOR: char = ':';
const SCAN_BATCH: usize = 500;

/// Cache backed by an external Redis server.
///
/// Payloads are stored as JSON strings with `SET key value EX ttl`, so expiry
/// is enforced by Redis itself and a `SET` replaces the whole value at once.
/// All keys live under a prefix so `clear` only touches this cache's entries.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    prefix: String,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect to Redis at `url` (`redis://host:port/db`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_prefix(url, DEFAULT_KEY_PREFIX).await
    }

    /// Connect to Redis using a custom key prefix.
    ///
    /// The server must answer `PING` before the cache is handed out.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect_with_prefix(url: &str, prefix: impl Into<String>) -> Result<Self> {
        info!("Connecting to Redis...");
        let client = redis::Client::open(url).map_err(|e| VantageError::Cache(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| VantageError::Cache(e.to_string()))?;

        let cache = Self {
            connection,
            prefix: prefix.into(),
        };
        if !cache.health_check().await? {
            return Err(VantageError::Cache("Redis did not answer PING".to_string()));
        }
        info!("Redis connection established");
        Ok(cache)
    }

    /// Check the server answers `PING`.
    ///
    /// # Errors
    /// Returns an error if the command fails.
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| VantageError::Cache(e.to_string()))?;
        Ok(reply == "PONG")
    }

    fn namespaced(&self, key: &CacheKey) -> String {
        namespaced_key(&self.prefix, key)
    }
}

fn namespaced_key(prefix: &str, key: &CacheKey) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{KEY_SEPARATOR}{key}")
    }
}

/// `SCAN` pattern matching every key of this cache.
///
/// An empty prefix would match the whole database, so it is refused.
fn clear_pattern(prefix: &str) -> Result<String> {
    if prefix.is_empty() {
        return Err(VantageError::Cache(
            "refusing to clear a Redis cache without a key prefix".to_string(),
        ));
    }
    Ok(format!("{prefix}{KEY_SEPARATOR}*"))
}

/// Redis rejects `EX 0`; sub-second TTLs round up to one second.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl ResponseCache for RedisCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn
            .get(self.namespaced(key))
            .await
            .map_err(|e| VantageError::Cache(e.to_string()))?;

        match value {
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
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(self.namespaced(key), json, ttl_seconds(ttl))
            .await
            .map_err(|e| VantageError::Cache(e.to_string()))?;
        debug!("Cached payload");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn
            .del(self.namespaced(key))
            .await
            .map_err(|e| VantageError::Cache(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn purge_expired(&self) -> Result<usize> {
        // Redis evicts expired keys on its own.
        Ok(0)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let pattern = clear_pattern(&self.prefix)?;
        let mut conn = self.connection.clone();

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| VantageError::Cache(e.to_string()))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        if !keys.is_empty() {
            let _: i64 = conn
                .del(&keys)
                .await
                .map_err(|e| VantageError::Cache(e.to_string()))?;
        }
        debug!("Cleared {} cache entries", keys.len());
        Ok(())
    }
}

//! In-memory cache implementation.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};
use vantage_core::{CacheKey, ResponseCache, Result};

/// Cache entry with an absolute expiry.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(payload: Value, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            payload,
            expires_at: now.checked_add(ttl).unwrap_or(now + Duration::from_secs(86_400 * 365)),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache for single-node deployments and tests.
///
/// Entries live in a `RwLock`-protected `HashMap` and are lost when the cache
/// is dropped. Expiry is measured on the tokio clock, so a paused test runtime
/// controls it. Each `put` replaces the entry under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let cache = self.entries.read().await;
        match cache.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                debug!("Cache hit");
                Ok(Some(entry.payload.clone()))
            }
            Some(_) => {
                debug!("Cache entry expired");
                Ok(None)
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(key = %key, ttl_secs = ttl.as_secs()))]
    async fn put(&self, key: &CacheKey, payload: &Value, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(payload.clone(), ttl);
        self.entries.write().await.insert(key.clone(), entry);
        debug!("Cached payload");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut cache = self.entries.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_expired(now));
        let removed = before - cache.len();

        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}

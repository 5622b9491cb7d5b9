//! No-op cache implementation.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;
use vantage_core::{CacheKey, ResponseCache, Result};

/// A no-op cache that doesn't store anything.
///
/// `get` always returns `Ok(None)` and `put` always returns `Ok(())`.
/// Useful for disabling caching or testing code paths without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Value>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _key: &CacheKey, _payload: &Value, _ttl: Duration) -> Result<()> {
        trace!("NoopCache: put called, doing nothing");
        Ok(())
    }

    async fn remove(&self, _key: &CacheKey) -> Result<bool> {
        trace!("NoopCache: remove called, returning false");
        Ok(false)
    }

    async fn purge_expired(&self) -> Result<usize> {
        trace!("NoopCache: purge_expired called, returning 0");
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopCache: clear called, doing nothing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_cache_never_stores() {
        let cache = NoopCache::new();
        let key = CacheKey::new("quote:AAPL:");

        assert!(
            cache
                .put(&key, &json!({"a": 1}), Duration::from_secs(3600))
                .await
                .is_ok()
        );
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(!cache.remove(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_noop_cache_management() {
        let cache = NoopCache::new();
        assert_eq!(cache.purge_expired().await.unwrap(), 0);
        assert!(cache.clear().await.is_ok());
    }
}

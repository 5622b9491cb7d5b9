//! Cache trait for storing provider responses.
//!
//! This module defines the [`ResponseCache`] trait: a string-keyed store of
//! JSON payloads where every entry carries its own time-to-live.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::{error::Result, key::CacheKey};

/// Trait for caching provider responses with per-entry expiry.
///
/// Implementations can store data in various backends (Redis, SQLite,
/// in-memory, etc.). They are shared across all fetchers, so `put` must be
/// atomic: a concurrent `get` observes either the previous or the fully
/// written value.
#[async_trait]
pub trait ResponseCache: Send + Sync + std::fmt::Debug {
    /// Retrieves a cached payload.
    ///
    /// Returns `Ok(None)` if the key is missing or its entry has expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>>;

    /// Stores a payload, replacing any existing entry and resetting its TTL.
    async fn put(&self, key: &CacheKey, payload: &Value, ttl: Duration) -> Result<()>;

    /// Removes one entry. Returns whether an entry was present.
    async fn remove(&self, key: &CacheKey) -> Result<bool>;

    /// Drops every expired entry.
    ///
    /// Returns the number of entries removed.
    async fn purge_expired(&self) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;
}

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cache store implementations for the vantage fetch layer.
//!
//! This crate provides implementations of the [`ResponseCache`] trait from `vantage-core`:
//!
//! - [`InMemoryCache`] - In-process cache, the default for a single node
//! - [`NoopCache`] - No-op cache that doesn't store anything
//! - [`SqliteCache`] - Persistent SQLite-based cache (requires `sqlite` feature)
//! - `RedisCache` - Cache shared through a Redis server (requires `redis` feature)

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;

/// Redis-based cache implementation.
#[cfg(feature = "redis")]
pub mod redis;

/// SQLite-based cache implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use vantage_core::ResponseCache;

// Re-export implementations
pub use memory::InMemoryCache;
pub use noop::NoopCache;

#[cfg(feature = "redis")]
pub use crate::redis::RedisCache;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;

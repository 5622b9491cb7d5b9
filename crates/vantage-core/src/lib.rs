#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the vantage fetch layer.
//!
//! This crate provides the foundational abstractions shared by the cache
//! implementations, the Alpha Vantage provider and the bulk orchestrator:
//!
//! - [`RequestSpec`](request::RequestSpec) - An operation plus its provider parameters
//! - [`derive_key`](key::derive_key) - Maps a request onto a stable cache key
//! - [`ResponseCache`](cache::ResponseCache) - Caching abstraction with per-entry TTL
//! - [`VantageError`](error::VantageError) - Error taxonomy

/// Cache trait for storing provider responses.
pub mod cache;
/// Error types for fetch operations.
pub mod error;
/// Cache key derivation.
pub mod key;
/// Operations and request specs.
pub mod request;
/// Core data types (Symbol, FetchResult, BulkResult).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::ResponseCache;
pub use error::{Result, VantageError};
pub use key::{CacheKey, derive_key};
pub use request::{Operation, PARAM_FUNCTION, PARAM_OUTPUT_SIZE, PARAM_SYMBOL, RequestSpec};
pub use types::{BulkResult, FetchResult, Symbol};

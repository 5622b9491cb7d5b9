#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Rate-limited, cache-backed Alpha Vantage fetch layer.
//!
//! Every request is derived into a deterministic cache key and served from
//! the cache while fresh. Misses go to the provider; throttled responses are
//! retried after a fixed back-off up to a bounded number of attempts, and
//! successful payloads are cached for an hour. Bulk jobs fetch symbols one at
//! a time with a pause between items and report failures per symbol.
//!
//! # Features
//!
//! - `sqlite` - SQLite cache store (default)
//! - `redis` - Redis cache store
//!
//! # Example
//!
//! ```rust,ignore
//! use vantage::{Symbol, VantageClient, VantageConfig};
//!
//! #[tokio::main]
//! async fn main() -> vantage::Result<()> {
//!     let config = VantageConfig::from_env()?;
//!     let client = VantageClient::from_config(&config).await?;
//!
//!     let symbols = [Symbol::new("IBM"), Symbol::new("MSFT")];
//!     let bulk = client.bulk_series(&symbols, None).await?;
//!     for (symbol, outcome) in bulk.iter() {
//!         println!("{symbol}: {}", outcome.is_ok());
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use vantage_core::*;

// Cache implementations
#[cfg(feature = "redis")]
pub use vantage_cache::RedisCache;
#[cfg(feature = "sqlite")]
pub use vantage_cache::SqliteCache;
pub use vantage_cache::{InMemoryCache, NoopCache};

// Provider
pub use vantage_alpha::{
    CancellationToken, FetchPolicy, HttpTransport, RateLimitedFetcher, RawResponse, RequestArgs,
    RequestCatalog, RequestQuota, Transport,
};

mod bulk;
mod client;
mod config;
mod jobs;

pub use bulk::{BulkOrchestrator, DEFAULT_INTER_ITEM_DELAY, PacingPolicy};
pub use client::VantageClient;
pub use config::{API_KEY_VAR, CacheBackend, VantageConfig};
pub use jobs::{RefreshJob, bulk_to_json};

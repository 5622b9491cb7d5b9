#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Alpha Vantage data provider.
//!
//! This crate talks to the [Alpha Vantage](https://www.alphavantage.co/) query
//! endpoint on behalf of the `vantage` fetch layer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vantage_alpha::{HttpTransport, RateLimitedFetcher, RequestCatalog};
//! use vantage_cache::InMemoryCache;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = RateLimitedFetcher::new(
//!         Arc::new(HttpTransport::new()?),
//!         Arc::new(InMemoryCache::new()),
//!         "your_api_key",
//!     )?;
//!
//!     let spec = RequestCatalog::new().quote("IBM")?;
//!     let quote = fetcher.fetch(&spec).await?;
//!     println!("{} (cached: {})", quote.payload, quote.from_cache);
//!
//!     Ok(())
//! }
//! ```

/// Request catalog.
pub mod catalog;
/// Rate-limited fetcher.
pub mod fetcher;
/// Scripted transport for tests.
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// Shared request quota.
pub mod quota;
/// HTTP transport.
pub mod transport;

pub use catalog::{BULK_OUTPUT_SIZE, DEFAULT_SERIES_FUNCTION, RequestArgs, RequestCatalog};
pub use fetcher::{FetchPolicy, RateLimitedFetcher};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
pub use quota::RequestQuota;
pub use transport::{ALPHA_VANTAGE_BASE_URL, HttpTransport, RawResponse, Transport};
pub use tokio_util::sync::CancellationToken;

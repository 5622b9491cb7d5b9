//! Error types for fetch operations.
//!
//! This module defines [`VantageError`] which covers every failure the fetch
//! layer can report: invalid requests, transport failures, malformed provider
//! responses, exhausted rate-limit retries, configuration and cache problems,
//! and cancellation.

use thiserror::Error;

/// Errors that can occur while building, fetching or caching requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VantageError {
    /// Malformed or incomplete operation arguments, detected before any I/O.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network failure or an unexpected non-success status from the provider.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider response could not be parsed as JSON.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The provider kept signalling its per-minute quota past the retry bound.
    #[error("Rate limit exceeded after {attempts} throttled attempts")]
    RateLimitExceeded {
        /// Number of throttled responses observed.
        attempts: u32,
    },

    /// Missing or invalid process configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error interacting with the cache store.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The operation was aborted by a cancellation signal.
    #[error("Operation cancelled")]
    Cancelled,
}

impl VantageError {
    /// Returns true if this error was produced by a cancellation signal.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias using [`VantageError`].
pub type Result<T> = std::result::Result<T, VantageError>;

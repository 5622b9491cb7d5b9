//! Core data types returned by the fetch layer.
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`FetchResult`] - A provider payload plus its provenance
//! - [`BulkResult`] - Per-symbol outcomes of a bulk fetch, in input order

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Result;

/// A trading symbol/ticker.
///
/// Symbols are trimmed and uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the symbol is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A provider payload together with where it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// The raw provider response.
    pub payload: Value,
    /// True when served from the cache store rather than the network.
    pub from_cache: bool,
}

impl FetchResult {
    /// A result served from the cache store.
    #[must_use]
    pub const fn cached(payload: Value) -> Self {
        Self {
            payload,
            from_cache: true,
        }
    }

    /// A result freshly retrieved from the provider.
    #[must_use]
    pub const fn fresh(payload: Value) -> Self {
        Self {
            payload,
            from_cache: false,
        }
    }
}

/// Outcomes of a bulk fetch keyed by symbol.
///
/// Entries keep the order in which they were recorded, which is the order of
/// the input symbol list. A failed symbol holds its error instead of a payload.
#[derive(Debug, Default)]
pub struct BulkResult {
    entries: Vec<(Symbol, Result<FetchResult>)>,
}

impl BulkResult {
    /// Create an empty result with room for `capacity` symbols.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Record the outcome for a symbol.
    ///
    /// Recording the same symbol twice replaces the earlier outcome in place.
    pub fn record(&mut self, symbol: Symbol, outcome: Result<FetchResult>) {
        match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
            Some(entry) => entry.1 = outcome,
            None => self.entries.push((symbol, outcome)),
        }
    }

    /// Look up the outcome for a symbol.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Result<FetchResult>> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, outcome)| outcome)
    }

    /// Iterate over `(symbol, outcome)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Result<FetchResult>)> {
        self.entries.iter().map(|(s, outcome)| (s, outcome))
    }

    /// Symbols in input order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter().map(|(s, _)| s)
    }

    /// Number of symbols recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of symbols that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_err()).count()
    }

    /// Consume the result, yielding `(symbol, outcome)` pairs in input order.
    #[must_use]
    pub fn into_entries(self) -> Vec<(Symbol, Result<FetchResult>)> {
        self.entries
    }
}

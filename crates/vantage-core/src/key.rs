//! Cache key derivation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::request::{Operation, RequestSpec};

/// Separator between key components.
pub const KEY_DELIMITER: char = ':';

/// Escape character for components containing the delimiter.
const ESCAPE: char = '%';

/// A stable string key identifying the semantic content of a request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already derived key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a request.
///
/// The key is `operation:symbol:outputsize`, with absent values left empty.
/// Bulk series requests append the series function, since one symbol can be
/// fetched under several series functions with differently shaped responses.
/// No other parameter takes part in the key. Occurrences of the delimiter
/// inside a component are escaped, so distinct requests never share a key.
#[must_use]
pub fn derive_key(spec: &RequestSpec) -> CacheKey {
    let mut parts = vec![
        spec.operation().id(),
        spec.symbol().unwrap_or_default(),
        spec.output_size().unwrap_or_default(),
    ];
    if spec.operation() == Operation::BulkSeries {
        parts.push(spec.function().unwrap_or_default());
    }

    let mut key = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(KEY_DELIMITER);
        }
        push_escaped(&mut key, part);
    }
    CacheKey(key)
}

fn push_escaped(key: &mut String, part: &str) {
    for c in part.chars() {
        match c {
            ESCAPE => key.push_str("%25"),
            KEY_DELIMITER => key.push_str("%3A"),
            c => key.push(c),
        }
    }
}

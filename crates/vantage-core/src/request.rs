//! Request description types.
//!
//! An [`Operation`] names one of the supported query shapes; a
//! [`RequestSpec`] pairs it with the provider parameters that will be sent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::VantageError;

/// Query parameter naming the provider function.
pub const PARAM_FUNCTION: &str = "function";
/// Query parameter carrying the ticker.
pub const PARAM_SYMBOL: &str = "symbol";
/// Query parameter selecting compact or full output.
pub const PARAM_OUTPUT_SIZE: &str = "outputsize";

/// Supported query shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Latest price for one symbol.
    Quote,
    /// Company fundamentals for one symbol.
    Overview,
    /// Sector performance across the market.
    SectorPerformance,
    /// Income statements for one symbol.
    IncomeStatement,
    /// Full time series for one symbol.
    BulkSeries,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Quote,
        Self::Overview,
        Self::SectorPerformance,
        Self::IncomeStatement,
        Self::BulkSeries,
    ];

    /// Stable identifier used in cache keys and job names.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Overview => "overview",
            Self::SectorPerformance => "sector_performance",
            Self::IncomeStatement => "income_statement",
            Self::BulkSeries => "bulk_series",
        }
    }

    /// Returns true if the operation needs a symbol argument.
    #[must_use]
    pub const fn requires_symbol(&self) -> bool {
        !matches!(self, Self::SectorPerformance)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Operation {
    type Err = VantageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VantageError::InvalidRequest(format!("Unknown operation: {s}")))
    }
}

/// A fully resolved request: operation plus provider parameters.
///
/// Built by the request catalog; immutable afterwards. The credential is never
/// part of a spec, it is appended by the fetcher.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestSpec {
    operation: Operation,
    params: BTreeMap<String, String>,
}

impl RequestSpec {
    /// Create a spec with no parameters.
    #[must_use]
    pub const fn new(operation: Operation) -> Self {
        Self {
            operation,
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter, replacing any earlier value for the same name.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The operation this spec belongs to.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Value of a parameter, if present.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All parameters, ordered by name.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// The `symbol` parameter, if present.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.param(PARAM_SYMBOL)
    }

    /// The `function` parameter, if present.
    #[must_use]
    pub fn function(&self) -> Option<&str> {
        self.param(PARAM_FUNCTION)
    }

    /// The `outputsize` parameter, if present.
    #[must_use]
    pub fn output_size(&self) -> Option<&str> {
        self.param(PARAM_OUTPUT_SIZE)
    }
}

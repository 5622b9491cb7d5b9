//! Request catalog: maps user arguments onto Alpha Vantage parameters.

use serde::{Deserialize, Serialize};
use vantage_core::{
    Operation, PARAM_FUNCTION, PARAM_OUTPUT_SIZE, PARAM_SYMBOL, RequestSpec, Result, Symbol,
    VantageError,
};

/// Series function used by bulk fetches when none is given.
pub const DEFAULT_SERIES_FUNCTION: &str = "TIME_SERIES_QUARTERLY_ADJUSTED";

/// Output size requested by bulk fetches.
pub const BULK_OUTPUT_SIZE: &str = "full";

/// User-supplied arguments for an operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArgs {
    /// Ticker, required by every operation except sector performance.
    pub symbol: Option<String>,
    /// Output size override (`compact` or `full`).
    pub output_size: Option<String>,
    /// Underlying series function for bulk series.
    pub series_function: Option<String>,
}

impl RequestArgs {
    /// Arguments carrying only a symbol.
    #[must_use]
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }

    /// Set the output size.
    #[must_use]
    pub fn with_output_size(mut self, output_size: impl Into<String>) -> Self {
        self.output_size = Some(output_size.into());
        self
    }

    /// Set the series function.
    #[must_use]
    pub fn with_series_function(mut self, function: impl Into<String>) -> Self {
        self.series_function = Some(function.into());
        self
    }
}

/// The fixed set of query shapes supported against Alpha Vantage.
///
/// Every builder is pure: it validates the arguments and returns a
/// [`RequestSpec`] without touching the cache or the network.
#[derive(Clone, Debug)]
pub struct RequestCatalog {
    default_series_function: String,
}

impl Default for RequestCatalog {
    fn default() -> Self {
        Self {
            default_series_function: DEFAULT_SERIES_FUNCTION.to_string(),
        }
    }
}

impl RequestCatalog {
    /// Create a catalog with the default series function.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different series function when bulk requests don't name one.
    #[must_use]
    pub fn with_default_series_function(mut self, function: impl Into<String>) -> Self {
        self.default_series_function = function.into();
        self
    }

    /// Build a request for an operation given by name.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] for unknown operations or
    /// missing required arguments.
    pub fn build_named(&self, operation: &str, args: &RequestArgs) -> Result<RequestSpec> {
        self.build(operation.parse()?, args)
    }

    /// Build a request for an operation.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] if a required argument is
    /// missing or blank.
    pub fn build(&self, operation: Operation, args: &RequestArgs) -> Result<RequestSpec> {
        let function = match operation {
            Operation::Quote => "GLOBAL_QUOTE",
            Operation::Overview => "OVERVIEW",
            Operation::SectorPerformance => "SECTOR",
            Operation::IncomeStatement => "INCOME_STATEMENT",
            Operation::BulkSeries => match args.series_function.as_deref().map(str::trim) {
                Some("") => {
                    return Err(VantageError::InvalidRequest(
                        "series function must not be blank".to_string(),
                    ));
                }
                Some(f) => f,
                None => self.default_series_function.as_str(),
            },
        };

        let mut spec = RequestSpec::new(operation).with_param(PARAM_FUNCTION, function);

        if operation.requires_symbol() {
            let symbol = args
                .symbol
                .as_deref()
                .map(Symbol::new)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    VantageError::InvalidRequest(format!("{operation} requires a symbol"))
                })?;
            spec = spec.with_param(PARAM_SYMBOL, symbol.as_str());
        }

        let output_size = match (operation, args.output_size.as_deref()) {
            (_, Some(size)) if !size.trim().is_empty() => Some(size.trim()),
            (Operation::BulkSeries, _) => Some(BULK_OUTPUT_SIZE),
            _ => None,
        };
        if let Some(size) = output_size {
            spec = spec.with_param(PARAM_OUTPUT_SIZE, size);
        }

        Ok(spec)
    }

    /// Latest price for a symbol.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] if the symbol is blank.
    pub fn quote(&self, symbol: &str) -> Result<RequestSpec> {
        self.build(Operation::Quote, &RequestArgs::symbol(symbol))
    }

    /// Company overview (market cap, EPS, description).
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] if the symbol is blank.
    pub fn overview(&self, symbol: &str) -> Result<RequestSpec> {
        self.build(Operation::Overview, &RequestArgs::symbol(symbol))
    }

    /// Sector performance.
    ///
    /// # Errors
    /// Never fails; the signature matches the other builders.
    pub fn sector_performance(&self) -> Result<RequestSpec> {
        self.build(Operation::SectorPerformance, &RequestArgs::default())
    }

    /// Income statements for a symbol.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] if the symbol is blank.
    pub fn income_statement(&self, symbol: &str) -> Result<RequestSpec> {
        self.build(Operation::IncomeStatement, &RequestArgs::symbol(symbol))
    }

    /// Full time series for a symbol, using the default series function
    /// when `function` is `None`.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] if the symbol or function is blank.
    pub fn bulk_series(&self, symbol: &str, function: Option<&str>) -> Result<RequestSpec> {
        let mut args = RequestArgs::symbol(symbol);
        args.series_function = function.map(str::to_string);
        self.build(Operation::BulkSeries, &args)
    }
}

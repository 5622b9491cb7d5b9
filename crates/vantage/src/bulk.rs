//! Bulk orchestrator: one paced fetch per symbol.

use std::time::Duration;

use tracing::{info, instrument, warn};
use vantage_alpha::{RateLimitedFetcher, RequestArgs, RequestCatalog};
use vantage_core::{BulkResult, Operation, Result, Symbol, VantageError};

/// Pause between bulk items.
///
/// Fifteen seconds keeps a sequential job under five requests per minute.
pub const DEFAULT_INTER_ITEM_DELAY: Duration = Duration::from_secs(15);

/// How a bulk job spaces its requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Pause before each symbol after the first.
    pub inter_item_delay: Duration,
    /// Skip the pause when the previous symbol was served from the cache.
    pub skip_pause_on_cache_hit: bool,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            inter_item_delay: DEFAULT_INTER_ITEM_DELAY,
            skip_pause_on_cache_hit: false,
        }
    }
}

/// Runs one fetch per symbol, in order, pacing the calls.
///
/// A failure for one symbol is recorded in the [`BulkResult`] and the batch
/// moves on. Only cancellation aborts the whole job.
#[derive(Clone, Debug)]
pub struct BulkOrchestrator {
    fetcher: RateLimitedFetcher,
    catalog: RequestCatalog,
    pacing: PacingPolicy,
}

impl BulkOrchestrator {
    /// Create an orchestrator with the default pacing.
    #[must_use]
    pub fn new(fetcher: RateLimitedFetcher, catalog: RequestCatalog) -> Self {
        Self {
            fetcher,
            catalog,
            pacing: PacingPolicy::default(),
        }
    }

    /// Replace the pacing policy.
    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    /// The pacing policy in effect.
    #[must_use]
    pub const fn pacing(&self) -> &PacingPolicy {
        &self.pacing
    }

    /// Fetch `operation` for every symbol.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] if the operation takes no
    /// symbol, and [`VantageError::Cancelled`] if cancelled mid-job.
    pub async fn fetch_bulk(&self, symbols: &[Symbol], operation: Operation) -> Result<BulkResult> {
        self.fetch_bulk_with(symbols, operation, &RequestArgs::default())
            .await
    }

    /// Fetch the full time series for every symbol.
    ///
    /// `function` defaults to the catalog's series function.
    ///
    /// # Errors
    /// Returns [`VantageError::Cancelled`] if cancelled mid-job.
    pub async fn fetch_bulk_series(
        &self,
        symbols: &[Symbol],
        function: Option<&str>,
    ) -> Result<BulkResult> {
        let args = RequestArgs {
            series_function: function.map(str::to_string),
            ..RequestArgs::default()
        };
        self.fetch_bulk_with(symbols, Operation::BulkSeries, &args)
            .await
    }

    /// Fetch `operation` for every symbol, filling each request from `template`.
    ///
    /// The template's symbol is replaced by each input symbol in turn.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`] if the operation takes no
    /// symbol, and [`VantageError::Cancelled`] if cancelled mid-job.
    #[instrument(
        skip(self, symbols, template),
        fields(operation = %operation, symbol_count = symbols.len())
    )]
    pub async fn fetch_bulk_with(
        &self,
        symbols: &[Symbol],
        operation: Operation,
        template: &RequestArgs,
    ) -> Result<BulkResult> {
        if !operation.requires_symbol() {
            return Err(VantageError::InvalidRequest(format!(
                "{operation} does not take a symbol and cannot be fetched in bulk"
            )));
        }

        let mut result = BulkResult::with_capacity(symbols.len());
        let mut pause_before_next = false;

        for symbol in symbols {
            if pause_before_next {
                self.pause().await?;
            }

            info!(symbol = %symbol, "Fetching bulk item");
            let args = RequestArgs {
                symbol: Some(symbol.to_string()),
                ..template.clone()
            };
            let outcome = match self.catalog.build(operation, &args) {
                Ok(spec) => self.fetcher.fetch(&spec).await,
                Err(e) => Err(e),
            };

            match &outcome {
                Err(VantageError::Cancelled) => return Err(VantageError::Cancelled),
                Err(e) => warn!(symbol = %symbol, error = %e, "Bulk item failed, continuing"),
                Ok(_) => {}
            }

            let served_from_cache = outcome.as_ref().is_ok_and(|r| r.from_cache);
            pause_before_next = !(self.pacing.skip_pause_on_cache_hit && served_from_cache);
            result.record(symbol.clone(), outcome);
        }

        info!(
            fetched = result.len() - result.failure_count(),
            failed = result.failure_count(),
            "Bulk job finished"
        );
        Ok(result)
    }

    async fn pause(&self) -> Result<()> {
        let cancel = self.fetcher.cancellation_token();
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(VantageError::Cancelled),
            () = tokio::time::sleep(self.pacing.inter_item_delay) => Ok(()),
        }
    }
}

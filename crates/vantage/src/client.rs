//! High-level client wiring catalog, fetcher, cache and bulk orchestrator.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use vantage_alpha::{
    CancellationToken, HttpTransport, RateLimitedFetcher, RequestArgs, RequestCatalog,
    RequestQuota,
};
use vantage_cache::{InMemoryCache, NoopCache};
use vantage_core::{BulkResult, FetchResult, Operation, ResponseCache, Result, Symbol};

use crate::bulk::{BulkOrchestrator, PacingPolicy};
use crate::config::{CacheBackend, VantageConfig};
use crate::jobs::RefreshJob;

/// Entry point for fetching Alpha Vantage data.
///
/// Every call goes through the request catalog, so invalid arguments fail
/// before the cache or the network is touched.
///
/// # Example
///
/// ```rust,ignore
/// use vantage::{VantageClient, VantageConfig};
///
/// #[tokio::main]
/// async fn main() -> vantage::Result<()> {
///     let config = VantageConfig::from_env()?;
///     let client = VantageClient::from_config(&config).await?;
///
///     let quote = client.quote("IBM").await?;
///     println!("{}", quote.payload);
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct VantageClient {
    catalog: RequestCatalog,
    fetcher: RateLimitedFetcher,
    orchestrator: BulkOrchestrator,
}

impl VantageClient {
    /// Build a client from configuration, opening the configured cache.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or the cache store cannot be created.
    pub async fn from_config(config: &VantageConfig) -> Result<Self> {
        let transport = HttpTransport::new()?.with_base_url(config.base_url.clone());
        let cache = open_cache(&config.cache).await?;

        let mut fetcher = RateLimitedFetcher::new(Arc::new(transport), cache, config.api_key())?
            .with_policy(config.fetch.clone());
        if let Some(rpm) = config.requests_per_minute {
            fetcher = fetcher.with_quota(RequestQuota::per_minute(rpm)?);
        }

        debug!(?config, "Client configured");
        Ok(Self::new(fetcher, config.pacing.clone()))
    }

    /// Build a client around an existing fetcher.
    #[must_use]
    pub fn new(fetcher: RateLimitedFetcher, pacing: PacingPolicy) -> Self {
        let catalog = RequestCatalog::new();
        let orchestrator =
            BulkOrchestrator::new(fetcher.clone(), catalog.clone()).with_pacing(pacing);
        Self {
            catalog,
            fetcher,
            orchestrator,
        }
    }

    /// Token that cancels in-flight waits of this client.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.fetcher.cancellation_token().clone()
    }

    /// The cache store in use.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        self.fetcher.cache()
    }

    /// Fetch a single operation.
    ///
    /// # Errors
    /// Returns [`VantageError::InvalidRequest`](vantage_core::VantageError::InvalidRequest)
    /// for bad arguments, otherwise whatever the fetch produced.
    pub async fn fetch(&self, operation: Operation, args: &RequestArgs) -> Result<FetchResult> {
        let spec = self.catalog.build(operation, args)?;
        self.fetcher.fetch(&spec).await
    }

    /// Latest price for a symbol.
    ///
    /// # Errors
    /// See [`VantageClient::fetch`].
    pub async fn quote(&self, symbol: &str) -> Result<FetchResult> {
        self.fetch(Operation::Quote, &RequestArgs::symbol(symbol))
            .await
    }

    /// Company overview (market cap, EPS, description).
    ///
    /// # Errors
    /// See [`VantageClient::fetch`].
    pub async fn company_overview(&self, symbol: &str) -> Result<FetchResult> {
        self.fetch(Operation::Overview, &RequestArgs::symbol(symbol))
            .await
    }

    /// Sector performance.
    ///
    /// # Errors
    /// See [`VantageClient::fetch`].
    pub async fn sector_performance(&self) -> Result<FetchResult> {
        self.fetch(Operation::SectorPerformance, &RequestArgs::default())
            .await
    }

    /// Income statements for a symbol.
    ///
    /// # Errors
    /// See [`VantageClient::fetch`].
    pub async fn income_statement(&self, symbol: &str) -> Result<FetchResult> {
        self.fetch(Operation::IncomeStatement, &RequestArgs::symbol(symbol))
            .await
    }

    /// Fetch `operation` for several symbols, paced.
    ///
    /// # Errors
    /// See [`BulkOrchestrator::fetch_bulk`].
    pub async fn fetch_bulk(&self, symbols: &[Symbol], operation: Operation) -> Result<BulkResult> {
        self.orchestrator.fetch_bulk(symbols, operation).await
    }

    /// Full time series for several symbols, paced.
    ///
    /// # Errors
    /// See [`BulkOrchestrator::fetch_bulk_series`].
    pub async fn bulk_series(
        &self,
        symbols: &[Symbol],
        function: Option<&str>,
    ) -> Result<BulkResult> {
        self.orchestrator.fetch_bulk_series(symbols, function).await
    }

    /// Run a refresh job, returning its JSON result.
    ///
    /// # Errors
    /// See [`RefreshJob::run`].
    pub async fn run_job(&self, job: &RefreshJob) -> Result<Value> {
        job.run(self).await
    }
}

async fn open_cache(backend: &CacheBackend) -> Result<Arc<dyn ResponseCache>> {
    let cache: Arc<dyn ResponseCache> = match backend {
        CacheBackend::Memory => Arc::new(InMemoryCache::new()),
        CacheBackend::Disabled => Arc::new(NoopCache::new()),
        #[cfg(feature = "sqlite")]
        CacheBackend::Sqlite { path } => Arc::new(vantage_cache::SqliteCache::new(path)?),
        #[cfg(not(feature = "sqlite"))]
        CacheBackend::Sqlite { .. } => {
            return Err(vantage_core::VantageError::Configuration(
                "built without the sqlite feature".to_string(),
            ));
        }
        #[cfg(feature = "redis")]
        CacheBackend::Redis { url } => Arc::new(vantage_cache::RedisCache::connect(url).await?),
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis { .. } => {
            return Err(vantage_core::VantageError::Configuration(
                "built without the redis feature".to_string(),
            ));
        }
    };
    Ok(cache)
}

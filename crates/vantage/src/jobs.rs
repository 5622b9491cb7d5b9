//! Refresh jobs run on behalf of an external job queue.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;
use vantage_core::{BulkResult, Result, Symbol};

use crate::client::VantageClient;

/// A named refresh job.
///
/// Each job performs exactly one fetch or bulk fetch and hands the JSON
/// result back to the queue that scheduled it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum RefreshJob {
    /// Refresh the latest price for a symbol.
    RefreshStockPrice {
        /// Ticker.
        symbol: String,
    },
    /// Refresh company fundamentals for a symbol.
    RefreshCompanyOverview {
        /// Ticker.
        symbol: String,
    },
    /// Refresh sector performance.
    RefreshSectorPerformance,
    /// Refresh income statements for a symbol.
    RefreshIncomeStatement {
        /// Ticker.
        symbol: String,
    },
    /// Refresh the full time series for several symbols.
    RefreshBulkData {
        /// Tickers, fetched in this order.
        symbols: Vec<String>,
        /// Series function; the quarterly adjusted series when absent.
        #[serde(default)]
        function: Option<String>,
    },
}

impl RefreshJob {
    /// The job's name as used by the queue.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RefreshStockPrice { .. } => "refresh_stock_price",
            Self::RefreshCompanyOverview { .. } => "refresh_company_overview",
            Self::RefreshSectorPerformance => "refresh_sector_performance",
            Self::RefreshIncomeStatement { .. } => "refresh_income_statement",
            Self::RefreshBulkData { .. } => "refresh_bulk_data",
        }
    }

    /// Run the job against `client`.
    ///
    /// Single fetches return the provider payload. Bulk jobs return an object
    /// mapping each symbol, in input order, to its payload or to
    /// `{"error": message}`.
    ///
    /// # Errors
    /// Returns the fetch error for single fetches, and only cancellation or
    /// invalid arguments for bulk jobs.
    pub async fn run(&self, client: &VantageClient) -> Result<Value> {
        info!(job = self.name(), "Running refresh job");
        let result = match self {
            Self::RefreshStockPrice { symbol } => client.quote(symbol).await?.payload,
            Self::RefreshCompanyOverview { symbol } => {
                client.company_overview(symbol).await?.payload
            }
            Self::RefreshSectorPerformance => client.sector_performance().await?.payload,
            Self::RefreshIncomeStatement { symbol } => {
                client.income_statement(symbol).await?.payload
            }
            Self::RefreshBulkData { symbols, function } => {
                let symbols: Vec<Symbol> = symbols.iter().map(Symbol::new).collect();
                let bulk = client.bulk_series(&symbols, function.as_deref()).await?;
                bulk_to_json(bulk)
            }
        };
        Ok(result)
    }
}

/// Flatten a bulk result into `{ symbol: payload | {"error": message} }`.
#[must_use]
pub fn bulk_to_json(bulk: BulkResult) -> Value {
    let mut out = Map::new();
    for (symbol, outcome) in bulk.into_entries() {
        let value = match outcome {
            Ok(fetched) => fetched.payload,
            Err(e) => json!({ "error": e.to_string() }),
        };
        out.insert(symbol.to_string(), value);
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vantage_alpha::{MockTransport, RateLimitedFetcher};
    use vantage_cache::InMemoryCache;
    use vantage_core::VantageError;

    use crate::bulk::PacingPolicy;

    fn client(transport: &Arc<MockTransport>) -> VantageClient {
        let fetcher =
            RateLimitedFetcher::new(transport.clone(), Arc::new(InMemoryCache::new()), "demo")
                .unwrap();
        VantageClient::new(fetcher, PacingPolicy::default())
    }

    #[test]
    fn test_job_deserialization() {
        let job: RefreshJob =
            serde_json::from_str(r#"{"job": "refresh_stock_price", "symbol": "AAPL"}"#).unwrap();
        assert_eq!(
            job,
            RefreshJob::RefreshStockPrice {
                symbol: "AAPL".to_string()
            }
        );

        let job: RefreshJob =
            serde_json::from_str(r#"{"job": "refresh_bulk_data", "symbols": ["AAPL", "GOOG"]}"#)
                .unwrap();
        assert_eq!(job.name(), "refresh_bulk_data");
        assert!(matches!(
            job,
            RefreshJob::RefreshBulkData { function: None, .. }
        ));

        let job: RefreshJob =
            serde_json::from_str(r#"{"job": "refresh_sector_performance"}"#).unwrap();
        assert_eq!(job, RefreshJob::RefreshSectorPerformance);
    }

    #[tokio::test]
    async fn test_single_job_returns_payload() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"Symbol": "MSFT", "MarketCapitalization": "3100000000000"}));
        let client = client(&transport);

        let job = RefreshJob::RefreshCompanyOverview {
            symbol: "MSFT".to_string(),
        };
        let value = job.run(&client).await.unwrap();

        assert_eq!(value["Symbol"], "MSFT");
        assert_eq!(transport.call_param(0, "function").as_deref(), Some("OVERVIEW"));
    }

    #[tokio::test]
    async fn test_single_job_propagates_error() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);

        let job = RefreshJob::RefreshIncomeStatement {
            symbol: String::new(),
        };
        assert!(matches!(
            job.run(&client).await,
            Err(VantageError::InvalidRequest(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_job_keeps_order_and_failures() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"Meta Data": {"2. Symbol": "GOOG"}}));
        transport.push_raw(500, "oops");
        let client = client(&transport);

        let job = RefreshJob::RefreshBulkData {
            symbols: vec!["GOOG".to_string(), "AAPL".to_string()],
            function: Some("TIME_SERIES_DAILY".to_string()),
        };
        let value = job.run(&client).await.unwrap();

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["GOOG", "AAPL"]);
        assert_eq!(value["AAPL"]["error"], "Transport error: HTTP 500: oops");
        assert_eq!(
            transport.call_param(0, "function").as_deref(),
            Some("TIME_SERIES_DAILY")
        );
    }
}

//! HTTP boundary to the Alpha Vantage query endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use vantage_core::{Result, VantageError};

/// Alpha Vantage query endpoint.
pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Timeout applied to each HTTP request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Issues one GET against the provider endpoint.
///
/// Implementations only report failures to complete the exchange; status
/// handling and body parsing belong to the fetcher.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send a GET with the given query parameters.
    async fn get(&self, query: &[(String, String)]) -> Result<RawResponse>;
}

/// [`Transport`] over `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport for the public Alpha Vantage endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VantageError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Create a transport with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
        }
    }

    /// Point the transport at a different endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, query: &[(String, String)]) -> Result<RawResponse> {
        debug!(base_url = %self.base_url, "Alpha Vantage request");

        let response = self
            .client
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .map_err(|e| VantageError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| VantageError::Transport(e.without_url().to_string()))?;

        Ok(RawResponse { status, body })
    }
}

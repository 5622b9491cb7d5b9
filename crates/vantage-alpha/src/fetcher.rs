//! Rate-limited, cache-backed fetcher.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use vantage_core::{FetchResult, RequestSpec, ResponseCache, Result, VantageError, derive_key};

use crate::quota::RequestQuota;
use crate::transport::{RawResponse, Transport};

/// Query parameter carrying the credential.
const PARAM_API_KEY: &str = "apikey";

/// HTTP status treated as a throttle signal alongside the body markers.
const TOO_MANY_REQUESTS: u16 = 429;

/// Longest slice of a failed response body kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Timing and retry constants for [`RateLimitedFetcher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Wait before re-issuing a throttled request.
    pub backoff: Duration,
    /// Retries allowed after a throttled response before giving up.
    pub max_retries: u32,
    /// How long a successful response stays cached.
    pub cache_ttl: Duration,
    /// Top-level response fields that signal the per-minute quota was hit.
    pub throttle_markers: Vec<String>,
    /// Top-level response fields that reject the call outright, such as
    /// invalid arguments, premium-only endpoints or an exhausted daily quota.
    pub rejection_markers: Vec<String>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(60),
            max_retries: 5,
            cache_ttl: Duration::from_secs(3600),
            throttle_markers: vec!["Note".to_string()],
            rejection_markers: vec!["Error Message".to_string(), "Information".to_string()],
        }
    }
}

impl FetchPolicy {
    /// Returns the marker found in `payload`, if any.
    #[must_use]
    pub fn throttle_marker<'a>(&'a self, payload: &Value) -> Option<&'a str> {
        find_marker(&self.throttle_markers, payload)
    }

    /// Returns the rejection marker found in `payload`, if any.
    ///
    /// Throttle markers take precedence, so a field listed in both is retried.
    #[must_use]
    pub fn rejection_marker<'a>(&'a self, payload: &Value) -> Option<&'a str> {
        if self.throttle_marker(payload).is_some() {
            return None;
        }
        find_marker(&self.rejection_markers, payload)
    }
}

fn find_marker<'a>(markers: &'a [String], payload: &Value) -> Option<&'a str> {
    let object = payload.as_object()?;
    markers
        .iter()
        .find(|marker| object.contains_key(marker.as_str()))
        .map(String::as_str)
}

/// Outcome of a single round trip.
enum Attempt {
    Payload(Value),
    Throttled(String),
}

/// Fetches one request at a time from Alpha Vantage.
///
/// A cache hit returns immediately. On a miss the request is sent with the
/// API key appended; throttled responses are retried after a fixed back-off
/// up to [`FetchPolicy::max_retries`] times, and genuine successes are cached
/// for [`FetchPolicy::cache_ttl`]. Back-off waits end early with
/// [`VantageError::Cancelled`] when the cancellation token fires.
#[derive(Clone)]
pub struct RateLimitedFetcher {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    api_key: String,
    policy: FetchPolicy,
    quota: Option<RequestQuota>,
    cancel: CancellationToken,
}

impl fmt::Debug for RateLimitedFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedFetcher")
            .field("transport", &self.transport)
            .field("cache", &self.cache)
            .field("api_key", &"[REDACTED]")
            .field("policy", &self.policy)
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl RateLimitedFetcher {
    /// Create a fetcher with the default policy.
    ///
    /// # Errors
    /// Returns [`VantageError::Configuration`] if the API key is blank.
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn ResponseCache>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(VantageError::Configuration(
                "Alpha Vantage API key is required".to_string(),
            ));
        }
        Ok(Self {
            transport,
            cache,
            api_key,
            policy: FetchPolicy::default(),
            quota: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the timing and retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Draw every network call from a shared quota.
    #[must_use]
    pub fn with_quota(mut self, quota: RequestQuota) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Abort waits when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// The token that cancels this fetcher's waits.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The cache store shared by this fetcher.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// Fetch a request, serving it from the cache when possible.
    ///
    /// # Errors
    /// - [`VantageError::Transport`] if the call cannot complete, returns a
    ///   non-success status, or is rejected by the provider
    /// - [`VantageError::MalformedResponse`] if the body is not a JSON object
    /// - [`VantageError::RateLimitExceeded`] if throttling outlasts the retry bound
    /// - [`VantageError::Cancelled`] if cancelled while waiting
    #[instrument(
        skip(self, spec),
        fields(operation = %spec.operation(), symbol = spec.symbol().unwrap_or_default())
    )]
    pub async fn fetch(&self, spec: &RequestSpec) -> Result<FetchResult> {
        let key = derive_key(spec);

        match self.cache.get(&key).await {
            Ok(Some(payload)) => {
                debug!(key = %key, "Serving from cache");
                return Ok(FetchResult::cached(payload));
            }
            Ok(None) => debug!(key = %key, "Cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Cache lookup failed, fetching"),
        }

        let query = self.query(spec);
        let mut throttled = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(VantageError::Cancelled);
            }
            self.acquire_quota().await?;

            match self.attempt(&query).await? {
                Attempt::Payload(payload) => {
                    if let Err(e) = self.cache.put(&key, &payload, self.policy.cache_ttl).await {
                        warn!(key = %key, error = %e, "Failed to cache response");
                    }
                    return Ok(FetchResult::fresh(payload));
                }
                Attempt::Throttled(reason) => {
                    throttled += 1;
                    if throttled > self.policy.max_retries {
                        warn!(attempts = throttled, "Throttled past retry bound");
                        return Err(VantageError::RateLimitExceeded {
                            attempts: throttled,
                        });
                    }
                    warn!(
                        attempt = throttled,
                        marker = %reason,
                        backoff_secs = self.policy.backoff.as_secs(),
                        "Rate limit exceeded, backing off"
                    );
                    self.wait(self.policy.backoff).await?;
                }
            }
        }
    }

    /// Spec parameters plus the credential.
    fn query(&self, spec: &RequestSpec) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = spec
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        query.push((PARAM_API_KEY.to_string(), self.api_key.clone()));
        query
    }

    /// One round trip, classified.
    async fn attempt(&self, query: &[(String, String)]) -> Result<Attempt> {
        let response = self.transport.get(query).await?;

        if response.status == TOO_MANY_REQUESTS {
            return Ok(Attempt::Throttled(format!("HTTP {TOO_MANY_REQUESTS}")));
        }
        if !response.is_success() {
            return Err(VantageError::Transport(format!(
                "HTTP {}: {}",
                response.status,
                body_excerpt(&response)
            )));
        }

        let payload: Value = serde_json::from_str(&response.body).map_err(|e| {
            VantageError::MalformedResponse(format!("{e}: {}", body_excerpt(&response)))
        })?;
        let Some(object) = payload.as_object() else {
            return Err(VantageError::MalformedResponse(format!(
                "expected a JSON object: {}",
                body_excerpt(&response)
            )));
        };

        if let Some(marker) = self.policy.throttle_marker(&payload) {
            return Ok(Attempt::Throttled(marker.to_string()));
        }
        if let Some(marker) = self.policy.rejection_marker(&payload) {
            return Err(VantageError::Transport(format!(
                "provider rejected request: {}",
                object.get(marker).and_then(Value::as_str).unwrap_or_default()
            )));
        }

        Ok(Attempt::Payload(payload))
    }

    async fn acquire_quota(&self) -> Result<()> {
        let Some(quota) = &self.quota else {
            return Ok(());
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(VantageError::Cancelled),
            () = quota.acquire() => Ok(()),
        }
    }

    async fn wait(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(VantageError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn body_excerpt(response: &RawResponse) -> &str {
    let body = response.body.trim();
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RequestCatalog;
    use crate::mock::MockTransport;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::Instant;
    use vantage_cache::InMemoryCache;
    use vantage_core::CacheKey;

    const BACKOFF: Duration = Duration::from_secs(60);

    fn fetcher(transport: &Arc<MockTransport>) -> RateLimitedFetcher {
        RateLimitedFetcher::new(transport.clone(), Arc::new(InMemoryCache::new()), "demo").unwrap()
    }

    fn quote_body(price: &str) -> Value {
        json!({"Global Quote": {"01. symbol": "IBM", "05. price": price}})
    }

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_fetch_served_from_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(quote_body("187.44"));
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let first = fetcher.fetch(&spec).await.unwrap();
        assert!(!first.from_cache);

        let start = Instant::now();
        let second = fetcher.fetch(&spec).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.payload, first.payload);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_after_ttl_goes_to_network() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(quote_body("187.44"));
        transport.push_json(quote_body("188.01"));
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        fetcher.fetch(&spec).await.unwrap();
        tokio::time::advance(fetcher.policy().cache_ttl + Duration::from_secs(1)).await;

        let refreshed = fetcher.fetch(&spec).await.unwrap();
        assert!(!refreshed.from_cache);
        assert_eq!(refreshed.payload, quote_body("188.01"));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_after_throttle() {
        let transport = Arc::new(MockTransport::new());
        transport.push_throttle();
        transport.push_throttle();
        transport.push_json(quote_body("187.44"));
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let start = Instant::now();
        let result = fetcher.fetch(&spec).await.unwrap();

        assert_eq!(result.payload, quote_body("187.44"));
        assert!(!result.from_cache);
        assert_eq!(transport.call_count(), 3);
        assert_elapsed(start, BACKOFF * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_payload_is_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.push_throttle();
        transport.push_json(quote_body("187.44"));
        let cache = Arc::new(InMemoryCache::new());
        let fetcher = RateLimitedFetcher::new(transport.clone(), cache.clone(), "demo").unwrap();
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        fetcher.fetch(&spec).await.unwrap();

        let cached = cache.get(&derive_key(&spec)).await.unwrap();
        assert_eq!(cached, Some(quote_body("187.44")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_is_a_throttle() {
        let transport = Arc::new(MockTransport::new());
        transport.push_raw(429, "");
        transport.push_json(quote_body("187.44"));
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let start = Instant::now();
        assert!(fetcher.fetch(&spec).await.is_ok());
        assert_elapsed(start, BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_information_notice_fails_without_waiting() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"Information": "This is a premium endpoint."}));
        transport.push_json(quote_body("187.44"));
        let cache = Arc::new(InMemoryCache::new());
        let fetcher = RateLimitedFetcher::new(transport.clone(), cache.clone(), "demo").unwrap();
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let start = Instant::now();
        let err = fetcher.fetch(&spec).await.unwrap_err();

        assert_eq!(
            err,
            VantageError::Transport("provider rejected request: This is a premium endpoint.".into())
        );
        assert_eq!(transport.call_count(), 1);
        assert!(start.elapsed() < Duration::from_millis(10));
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_information_marker_as_throttle_is_opt_in() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"Information": "API rate limit reached"}));
        transport.push_json(quote_body("187.44"));
        let mut policy = FetchPolicy::default();
        policy.throttle_markers.push("Information".to_string());
        let fetcher = fetcher(&transport).with_policy(policy);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let start = Instant::now();
        assert!(fetcher.fetch(&spec).await.is_ok());
        assert_elapsed(start, BACKOFF);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_retry_bound() {
        let transport = Arc::new(MockTransport::new());
        for _ in 0..10 {
            transport.push_throttle();
        }
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let start = Instant::now();
        let err = fetcher.fetch(&spec).await.unwrap_err();

        assert_eq!(err, VantageError::RateLimitExceeded { attempts: 6 });
        assert_eq!(transport.call_count(), 6);
        assert_elapsed(start, BACKOFF * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let transport = Arc::new(MockTransport::new());
        transport.push_throttle();
        transport.push_throttle();
        let policy = FetchPolicy {
            backoff: Duration::from_secs(5),
            max_retries: 1,
            ..FetchPolicy::default()
        };
        let fetcher = fetcher(&transport).with_policy(policy);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let start = Instant::now();
        let err = fetcher.fetch(&spec).await.unwrap_err();
        assert_eq!(err, VantageError::RateLimitExceeded { attempts: 2 });
        assert_elapsed(start, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_appends_api_key() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(quote_body("187.44"));
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        fetcher.fetch(&spec).await.unwrap();

        assert_eq!(transport.call_param(0, "apikey").as_deref(), Some("demo"));
        assert_eq!(
            transport.call_param(0, "function").as_deref(),
            Some("GLOBAL_QUOTE")
        );
        assert_eq!(transport.call_param(0, "symbol").as_deref(), Some("IBM"));
        assert!(spec.param("apikey").is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_raw(500, "Internal Server Error");
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().overview("IBM").unwrap();

        let err = fetcher.fetch(&spec).await.unwrap_err();
        assert_eq!(
            err,
            VantageError::Transport("HTTP 500: Internal Server Error".to_string())
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error("connection reset");
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().overview("IBM").unwrap();

        let err = fetcher.fetch(&spec).await.unwrap_err();
        assert!(matches!(err, VantageError::Transport(_)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let transport = Arc::new(MockTransport::new());
        transport.push_raw(200, "<html>maintenance</html>");
        transport.push_raw(200, "[1, 2, 3]");
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().sector_performance().unwrap();

        assert!(matches!(
            fetcher.fetch(&spec).await,
            Err(VantageError::MalformedResponse(_))
        ));
        assert!(matches!(
            fetcher.fetch(&spec).await,
            Err(VantageError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_rejection_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"Error Message": "Invalid API call."}));
        transport.push_json(json!({"Symbol": "IBM"}));
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().overview("IBM").unwrap();

        let err = fetcher.fetch(&spec).await.unwrap_err();
        assert_eq!(
            err,
            VantageError::Transport("provider rejected request: Invalid API call.".to_string())
        );

        let retry = fetcher.fetch(&spec).await.unwrap();
        assert!(!retry.from_cache);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let transport = Arc::new(MockTransport::new());
        transport.push_throttle();
        transport.push_json(quote_body("187.44"));
        let token = CancellationToken::new();
        let fetcher = fetcher(&transport).with_cancellation(token.clone());
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let task = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&spec).await }
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        token.cancel();

        let start = Instant::now();
        let result = task.await.unwrap();
        assert_eq!(result, Err(VantageError::Cancelled));
        assert_eq!(transport.call_count(), 1);
        assert!(start.elapsed() < BACKOFF);
    }

    #[tokio::test]
    async fn test_cancelled_fetcher_still_serves_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(quote_body("187.44"));
        let fetcher = fetcher(&transport);
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        fetcher.fetch(&spec).await.unwrap();
        fetcher.cancellation_token().cancel();

        assert!(fetcher.fetch(&spec).await.unwrap().from_cache);
        let other = RequestCatalog::new().quote("MSFT").unwrap();
        assert_eq!(fetcher.fetch(&other).await, Err(VantageError::Cancelled));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_quota_consumed_per_call() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(quote_body("187.44"));
        let quota = RequestQuota::per_minute(2).unwrap();
        let fetcher = fetcher(&transport).with_quota(quota.clone());
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        fetcher.fetch(&spec).await.unwrap();
        // cache hit draws nothing
        fetcher.fetch(&spec).await.unwrap();

        assert!(quota.try_acquire());
        assert!(!quota.try_acquire());
    }

    #[derive(Debug)]
    struct BrokenCache;

    #[async_trait]
    impl ResponseCache for BrokenCache {
        async fn get(&self, _key: &CacheKey) -> Result<Option<Value>> {
            Err(VantageError::Cache("connection refused".into()))
        }
        async fn put(&self, _key: &CacheKey, _payload: &Value, _ttl: Duration) -> Result<()> {
            Err(VantageError::Cache("connection refused".into()))
        }
        async fn remove(&self, _key: &CacheKey) -> Result<bool> {
            Ok(false)
        }
        async fn purge_expired(&self) -> Result<usize> {
            Ok(0)
        }
        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cache_failure_degrades_to_miss() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(quote_body("187.44"));
        let fetcher =
            RateLimitedFetcher::new(transport.clone(), Arc::new(BrokenCache), "demo").unwrap();
        let spec = RequestCatalog::new().quote("IBM").unwrap();

        let result = fetcher.fetch(&spec).await.unwrap();
        assert!(!result.from_cache);
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let err = RateLimitedFetcher::new(
            Arc::new(MockTransport::new()),
            Arc::new(InMemoryCache::new()),
            " ",
        )
        .unwrap_err();
        assert!(matches!(err, VantageError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let fetcher = RateLimitedFetcher::new(
            Arc::new(MockTransport::new()),
            Arc::new(InMemoryCache::new()),
            "secret_key_12345",
        )
        .unwrap();
        let debug_str = format!("{fetcher:?}");
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}

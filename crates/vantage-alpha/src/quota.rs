//! Shared request quota for one credential.

use governor::clock::DefaultClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use governor::{Quota, RateLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use vantage_core::{Result, VantageError};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket limiting requests per minute for one API key.
///
/// Clones share the same bucket, so every fetcher and bulk job holding a
/// clone draws from one quota. The bucket starts full.
#[derive(Clone)]
pub struct RequestQuota {
    limiter: Arc<DirectRateLimiter>,
    per_minute: NonZeroU32,
}

impl fmt::Debug for RequestQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestQuota")
            .field("per_minute", &self.per_minute)
            .finish_non_exhaustive()
    }
}

impl RequestQuota {
    /// Allow `requests` calls per minute.
    ///
    /// # Errors
    /// Returns [`VantageError::Configuration`] if `requests` is zero.
    pub fn per_minute(requests: u32) -> Result<Self> {
        let per_minute = NonZeroU32::new(requests).ok_or_else(|| {
            VantageError::Configuration("requests per minute must be positive".to_string())
        })?;
        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            per_minute,
        })
    }

    /// The configured requests-per-minute ceiling.
    #[must_use]
    pub const fn requests_per_minute(&self) -> u32 {
        self.per_minute.get()
    }

    /// Take one request slot if available right now.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait until a request slot is available and take it.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_quota_rejected() {
        assert!(matches!(
            RequestQuota::per_minute(0),
            Err(VantageError::Configuration(_))
        ));
    }

    #[test]
    fn test_burst_then_exhausted() {
        let quota = RequestQuota::per_minute(5).unwrap();
        for _ in 0..5 {
            assert!(quota.try_acquire());
        }
        assert!(!quota.try_acquire());
    }

    #[test]
    fn test_clones_share_bucket() {
        let quota = RequestQuota::per_minute(2).unwrap();
        let other = quota.clone();
        assert!(quota.try_acquire());
        assert!(other.try_acquire());
        assert!(!quota.try_acquire());
        assert_eq!(other.requests_per_minute(), 2);
    }
}

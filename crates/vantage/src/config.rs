//! Process configuration loaded from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vantage_alpha::{ALPHA_VANTAGE_BASE_URL, FetchPolicy};
use vantage_core::{Result, VantageError};

use crate::bulk::PacingPolicy;

/// Environment variable holding the Alpha Vantage credential.
pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";

/// Where fetched responses are cached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process cache.
    #[default]
    Memory,
    /// Redis server shared between processes.
    Redis {
        /// Connection URL, `redis://host:port/db`.
        url: String,
    },
    /// SQLite database file.
    Sqlite {
        /// Path of the database file.
        path: PathBuf,
    },
    /// No caching.
    Disabled,
}

/// Everything needed to build a [`VantageClient`](crate::VantageClient).
///
/// Passed explicitly to constructors; nothing is read from globals after
/// start-up.
#[derive(Clone, PartialEq, Eq)]
pub struct VantageConfig {
    api_key: String,
    /// Provider endpoint.
    pub base_url: String,
    /// Cache store backend.
    pub cache: CacheBackend,
    /// Fetch timing and retry constants.
    pub fetch: FetchPolicy,
    /// Bulk job pacing.
    pub pacing: PacingPolicy,
    /// Shared requests-per-minute ceiling for the credential, if any.
    pub requests_per_minute: Option<u32>,
}

impl fmt::Debug for VantageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VantageConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .field("fetch", &self.fetch)
            .field("pacing", &self.pacing)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

impl VantageConfig {
    /// Configuration with defaults for everything but the credential.
    ///
    /// # Errors
    /// Returns [`VantageError::Configuration`] if the API key is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(VantageError::Configuration(format!(
                "{API_KEY_VAR} is not set"
            )));
        }
        Ok(Self {
            api_key,
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
            cache: CacheBackend::default(),
            fetch: FetchPolicy::default(),
            pacing: PacingPolicy::default(),
            requests_per_minute: None,
        })
    }

    /// Load configuration from the process environment, reading `.env` first.
    ///
    /// # Errors
    /// Returns [`VantageError::Configuration`] if the credential is missing or
    /// a variable has an invalid value.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup.
    ///
    /// # Errors
    /// Returns [`VantageError::Configuration`] if the credential is missing or
    /// a variable has an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(get(API_KEY_VAR).unwrap_or_default())?;

        if let Some(url) = get("ALPHA_VANTAGE_BASE_URL") {
            config.base_url = url;
        }

        config.cache = match get("VANTAGE_CACHE").as_deref().map(str::trim) {
            None | Some("memory") => CacheBackend::Memory,
            Some("none") => CacheBackend::Disabled,
            Some("sqlite") => CacheBackend::Sqlite {
                path: get("VANTAGE_SQLITE_PATH")
                    .map_or_else(|| PathBuf::from("vantage-cache.db"), PathBuf::from),
            },
            Some("redis") => {
                let host = get("REDIS_HOST").unwrap_or_else(|| "localhost".to_string());
                let port: u16 = parse_var(&get, "REDIS_PORT", 6379)?;
                let db: u32 = parse_var(&get, "REDIS_DB", 0)?;
                CacheBackend::Redis {
                    url: format!("redis://{host}:{port}/{db}"),
                }
            }
            Some(other) => {
                return Err(VantageError::Configuration(format!(
                    "VANTAGE_CACHE must be memory, redis, sqlite or none, got {other}"
                )));
            }
        };

        let defaults = FetchPolicy::default();
        config.fetch = FetchPolicy {
            backoff: Duration::from_secs(parse_var(
                &get,
                "VANTAGE_BACKOFF_SECS",
                defaults.backoff.as_secs(),
            )?),
            max_retries: parse_var(&get, "VANTAGE_MAX_RETRIES", defaults.max_retries)?,
            cache_ttl: Duration::from_secs(parse_var(
                &get,
                "VANTAGE_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            throttle_markers: get("VANTAGE_THROTTLE_MARKERS")
                .map_or(defaults.throttle_markers, |raw| split_list(&raw)),
            ..defaults
        };

        let pacing = PacingPolicy::default();
        config.pacing = PacingPolicy {
            inter_item_delay: Duration::from_secs(parse_var(
                &get,
                "VANTAGE_BULK_DELAY_SECS",
                pacing.inter_item_delay.as_secs(),
            )?),
            skip_pause_on_cache_hit: parse_var(
                &get,
                "VANTAGE_SKIP_PAUSE_ON_CACHE_HIT",
                pacing.skip_pause_on_cache_hit,
            )?,
        };

        config.requests_per_minute = get("ALPHA_VANTAGE_REQUESTS_PER_MINUTE")
            .map(|_| parse_var(&get, "ALPHA_VANTAGE_REQUESTS_PER_MINUTE", 0))
            .transpose()?;

        Ok(config)
    }

    /// The Alpha Vantage credential.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T, G>(get: &G, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| VantageError::Configuration(format!("{name}={raw}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = VantageConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, VantageError::Configuration(_)));

        let err = VantageConfig::from_lookup(lookup(&[(API_KEY_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, VantageError::Configuration(_)));
    }

    #[test]
    fn test_defaults() {
        let config = VantageConfig::from_lookup(lookup(&[(API_KEY_VAR, "demo")])).unwrap();
        assert_eq!(config.api_key(), "demo");
        assert_eq!(config.base_url, ALPHA_VANTAGE_BASE_URL);
        assert_eq!(config.cache, CacheBackend::Memory);
        assert_eq!(config.fetch, FetchPolicy::default());
        assert_eq!(config.fetch.backoff, Duration::from_secs(60));
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.pacing.inter_item_delay, Duration::from_secs(15));
        assert!(!config.pacing.skip_pause_on_cache_hit);
        assert_eq!(config.requests_per_minute, None);
        assert_eq!(config.fetch.throttle_markers, vec!["Note"]);
    }

    #[test]
    fn test_redis_backend() {
        let config = VantageConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "demo"),
            ("VANTAGE_CACHE", "redis"),
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
        ]))
        .unwrap();
        assert_eq!(
            config.cache,
            CacheBackend::Redis {
                url: "redis://cache.internal:6380/0".to_string()
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = VantageConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "demo"),
            ("VANTAGE_CACHE", "sqlite"),
            ("VANTAGE_SQLITE_PATH", "/tmp/av.db"),
            ("VANTAGE_BACKOFF_SECS", "30"),
            ("VANTAGE_MAX_RETRIES", "2"),
            ("VANTAGE_CACHE_TTL_SECS", "600"),
            ("VANTAGE_BULK_DELAY_SECS", "12"),
            ("VANTAGE_SKIP_PAUSE_ON_CACHE_HIT", "true"),
            ("ALPHA_VANTAGE_REQUESTS_PER_MINUTE", "75"),
            ("VANTAGE_THROTTLE_MARKERS", "Note, Information"),
        ]))
        .unwrap();

        assert_eq!(
            config.cache,
            CacheBackend::Sqlite {
                path: PathBuf::from("/tmp/av.db")
            }
        );
        assert_eq!(config.fetch.backoff, Duration::from_secs(30));
        assert_eq!(config.fetch.max_retries, 2);
        assert_eq!(config.fetch.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.pacing.inter_item_delay, Duration::from_secs(12));
        assert!(config.pacing.skip_pause_on_cache_hit);
        assert_eq!(config.requests_per_minute, Some(75));
        assert_eq!(config.fetch.throttle_markers, vec!["Note", "Information"]);
        assert_eq!(
            config.fetch.rejection_markers,
            FetchPolicy::default().rejection_markers
        );
    }

    #[test]
    fn test_invalid_values() {
        let err = VantageConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "demo"),
            ("VANTAGE_MAX_RETRIES", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, VantageError::Configuration(_)));

        let err = VantageConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "demo"),
            ("VANTAGE_CACHE", "memcached"),
        ]))
        .unwrap_err();
        assert!(matches!(err, VantageError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = VantageConfig::new("secret_key_12345").unwrap();
        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}

//! Configuration for the query cache
//!
//! Defaults:
//! - GC delay: 60 seconds between the last unsubscribe and eviction
//! - Retries: none; queries may opt in, mutations never retry
//! - Retry jitter: 12.5% to spread out reconnect storms

use crate::error::{CacheError, Result};
use crate::fetcher::backoff;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for `retry_delay` and for any single backoff step
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// Configuration for the query client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long an entry with no subscribers is kept before eviction
    pub gc_delay: Duration,

    /// Retries for query fetches failing with a network error
    pub max_retries: u32,

    /// Base delay before the first retry, doubled on each further attempt
    pub retry_delay: Duration,

    /// Retry delay jitter factor (0.0 - 1.0)
    pub retry_jitter: f64,

    /// Refetch subscribed entries as soon as one of their tags is invalidated.
    /// When false they are only marked stale.
    pub refetch_on_invalidate: bool,

    /// Refetch a rejected entry when it is dispatched again
    pub refetch_on_error: bool,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            gc_delay: Duration::from_secs(60),
            max_retries: 0,
            retry_delay: Duration::from_millis(500),
            retry_jitter: 0.125,
            refetch_on_invalidate: true,
            refetch_on_error: true,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load overrides from the environment (and `.env` if present)
    ///
    /// Recognized variables:
    /// - `TRIPCACHE_GC_DELAY_MS`
    /// - `TRIPCACHE_MAX_RETRIES`
    /// - `TRIPCACHE_RETRY_DELAY_MS`
    /// - `TRIPCACHE_REFETCH_ON_INVALIDATE`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut builder = Self::builder();
        if let Some(ms) = env_var::<u64>("TRIPCACHE_GC_DELAY_MS")? {
            builder = builder.gc_delay(Duration::from_millis(ms));
        }
        if let Some(retries) = env_var::<u32>("TRIPCACHE_MAX_RETRIES")? {
            builder = builder.max_retries(retries);
        }
        if let Some(ms) = env_var::<u64>("TRIPCACHE_RETRY_DELAY_MS")? {
            builder = builder.retry_delay(Duration::from_millis(ms));
        }
        if let Some(enable) = env_var::<bool>("TRIPCACHE_REFETCH_ON_INVALIDATE")? {
            builder = builder.refetch_on_invalidate(enable);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.gc_delay.is_zero() {
            return Err(CacheError::ConfigError(
                "gc_delay must be greater than 0".to_string(),
            ));
        }

        if self.retry_delay > MAX_RETRY_DELAY {
            return Err(CacheError::ConfigError(format!(
                "retry_delay must be at most {:?}",
                MAX_RETRY_DELAY
            )));
        }

        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(CacheError::ConfigError(
                "retry_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Delay before retry number `attempt + 1`, with jitter applied.
    /// Each step is capped at [`MAX_RETRY_DELAY`] before jitter.
    pub fn retry_delay_for(&self, attempt: u32) -> Duration {
        let base = backoff(self.retry_delay, attempt).min(MAX_RETRY_DELAY);
        if self.retry_jitter == 0.0 {
            return base;
        }

        let base_secs = base.as_secs_f64();
        let jitter_range = base_secs * self.retry_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;

        Duration::try_from_secs_f64((base_secs + jitter).max(0.0)).unwrap_or(base)
    }
}

fn env_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            CacheError::ConfigError(format!("{} has an invalid value: {:?}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    gc_delay: Option<Duration>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    retry_jitter: Option<f64>,
    refetch_on_invalidate: Option<bool>,
    refetch_on_error: Option<bool>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set delay before unused entries are evicted
    pub fn gc_delay(mut self, delay: Duration) -> Self {
        self.gc_delay = Some(delay);
        self
    }

    /// Set number of retries for transient query failures
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set base retry delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Set retry jitter factor (0.0 - 1.0)
    pub fn retry_jitter(mut self, jitter: f64) -> Self {
        self.retry_jitter = Some(jitter);
        self
    }

    pub fn refetch_on_invalidate(mut self, enable: bool) -> Self {
        self.refetch_on_invalidate = Some(enable);
        self
    }

    pub fn refetch_on_error(mut self, enable: bool) -> Self {
        self.refetch_on_error = Some(enable);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            gc_delay: self.gc_delay.unwrap_or(defaults.gc_delay),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
            retry_jitter: self.retry_jitter.unwrap_or(defaults.retry_jitter),
            refetch_on_invalidate: self
                .refetch_on_invalidate
                .unwrap_or(defaults.refetch_on_invalidate),
            refetch_on_error: self.refetch_on_error.unwrap_or(defaults.refetch_on_error),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}

/// Preset configurations
impl CacheConfig {
    /// Short-lived entries for rapidly changing data
    pub fn realtime() -> Self {
        Self {
            gc_delay: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Retries enabled for flaky connections
    pub fn resilient() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            ..Default::default()
        }
    }

    /// Tiny delays, no jitter
    pub fn testing() -> Self {
        Self {
            gc_delay: Duration::from_millis(50),
            retry_delay: Duration::from_millis(1),
            retry_jitter: 0.0,
            ..Default::default()
        }
    }
}

/// Settings for fetchers that talk to the travel API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl ApiConfig {
    /// Read `TRAVEL_API_URL` (and `.env` if present)
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        std::env::var("TRAVEL_API_URL")
            .map(|base_url| Self { base_url })
            .unwrap_or_default()
    }
}

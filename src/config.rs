//! # Configuration System
//!
//! Typed configuration for the store connection, rate limiter, and cache service.
//! Values load from an optional `cachegate.toml` file layered with
//! `CACHEGATE_`-prefixed environment variables (e.g. `CACHEGATE_STORE__URL`),
//! with explicit validation instead of silent fallbacks.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cachegate::config::CacheGateConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheGateConfig::load()?;
//! let url = &config.store.url;
//! let timeout = config.store.operation_timeout();
//! # Ok(())
//! # }
//! ```

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the caching and rate-limiting layer.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheGateConfig {
    /// Remote store connection, retry, and circuit breaker settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Rate limiting defaults applied when callers omit per-call settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Cache namespacing and TTL settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Remote store connection and resilience configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Store connection URL
    pub url: String,

    /// Upper bound on simultaneous in-flight store operations
    pub max_connections: u32,

    /// Seconds allowed for establishing a connection
    pub connect_timeout_seconds: u64,

    /// Seconds allowed for a single dispatched operation
    pub operation_timeout_seconds: u64,

    /// Consecutive failures before the circuit breaker opens
    pub max_failures: u32,

    /// Seconds the circuit stays open before a half-open probe is allowed
    pub open_duration_seconds: u64,

    /// Retry attempts after the initial dispatch (0 disables retries)
    pub max_retries: u32,

    /// Base for exponential backoff between retries (`backoff_factor^attempt` seconds)
    pub backoff_factor: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            max_connections: 50,
            connect_timeout_seconds: 5,
            operation_timeout_seconds: 5,
            max_failures: 5,
            open_duration_seconds: 60,
            max_retries: 3,
            backoff_factor: 2.0,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }

    pub fn open_duration(&self) -> Duration {
        Duration::from_secs(self.open_duration_seconds)
    }

    /// Backoff delay before the retry following `attempt` (zero-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_factor.powi(attempt as i32))
    }
}

/// Selectable admission control algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// Continuous refill with burst capacity (default)
    TokenBucket,
    /// Exact enforcement over a moving interval; memory-heavier
    SlidingWindow,
    /// Discrete buckets; cheap but allows boundary bursts up to `2L-1`
    FixedWindow,
}

impl Default for RateLimitStrategy {
    fn default() -> Self {
        RateLimitStrategy::TokenBucket
    }
}

impl RateLimitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitStrategy::TokenBucket => "token_bucket",
            RateLimitStrategy::SlidingWindow => "sliding_window",
            RateLimitStrategy::FixedWindow => "fixed_window",
        }
    }
}

/// Rate limiting defaults, overridable per `check` call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in one window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_seconds: u64,

    /// Bucket capacity for token bucket bursts (defaults to `max_requests`)
    pub burst_size: Option<u32>,

    /// Admission algorithm applied when callers do not pick one
    #[serde(default)]
    pub strategy: RateLimitStrategy,

    /// Whether limits key on `(identifier, endpoint)` rather than identifier alone
    pub per_endpoint: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 60,
            burst_size: None,
            strategy: RateLimitStrategy::TokenBucket,
            per_endpoint: false,
        }
    }
}

/// Cache namespacing and TTL configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Prefix composed into every cache key as `prefix:category:key`
    pub namespace_prefix: String,

    /// Fallback TTL in seconds when a category has no default of its own
    pub fallback_ttl_seconds: u64,

    /// Batch size hint for incremental scan-and-delete invalidation
    pub scan_batch_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "cachegate".to_string(),
            fallback_ttl_seconds: 3600,
            scan_batch_size: 100,
        }
    }
}

impl CacheGateConfig {
    /// Load configuration from `cachegate.toml` (optional) layered with
    /// `CACHEGATE_`-prefixed environment variables.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from_file("cachegate")
    }

    /// Load configuration from a named file base, layered with env overrides.
    pub fn load_from_file(basename: &str) -> Result<Self, StoreError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(basename).required(false))
            .add_source(
                config::Environment::with_prefix("CACHEGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        let loaded: CacheGateConfig = settings
            .try_deserialize()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.store.url.is_empty() {
            return Err(StoreError::Configuration(
                "store.url must not be empty".to_string(),
            ));
        }
        if self.store.max_connections == 0 {
            return Err(StoreError::Configuration(
                "store.max_connections must be at least 1".to_string(),
            ));
        }
        if self.store.backoff_factor < 1.0 {
            return Err(StoreError::Configuration(
                "store.backoff_factor must be >= 1.0".to_string(),
            ));
        }
        if self.store.max_failures == 0 {
            return Err(StoreError::Configuration(
                "store.max_failures must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(StoreError::Configuration(
                "rate_limit.max_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(StoreError::Configuration(
                "rate_limit.window_seconds must be at least 1".to_string(),
            ));
        }
        if self.cache.namespace_prefix.is_empty() {
            return Err(StoreError::Configuration(
                "cache.namespace_prefix must not be empty".to_string(),
            ));
        }
        if self.cache.scan_batch_size == 0 {
            return Err(StoreError::Configuration(
                "cache.scan_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

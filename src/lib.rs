#![allow(clippy::doc_markdown)] // Allow technical terms like Redis, TTL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # CacheGate
//!
//! Resilient caching and rate-limiting layer that sits between request
//! handlers and a shared remote key-value store.
//!
//! ## Overview
//!
//! CacheGate owns the three concerns a service needs before trusting a remote
//! store on its hot path: connection management with bounded, observable
//! failure behavior; distributed admission control; and best-effort
//! cache-aside storage. A single [`StoreConnection`](store::StoreConnection)
//! is the only component that talks to the store, wrapping every operation in
//! circuit breaker gating and retry-with-backoff. [`RateLimiter`](ratelimit::RateLimiter)
//! and [`CacheService`](cache::CacheService) are built on top of it and share
//! one instance via dependency injection.
//!
//! ## Key Features
//!
//! - **Circuit breaker protection**: consecutive failures open the circuit and
//!   calls fail fast until a half-open probe confirms recovery
//! - **Three rate-limit strategies**: token bucket (bursts), sliding window
//!   (exact), fixed window (cheap) - all atomic under concurrent callers
//! - **Fail-open rate limiting**: a store outage degrades to "always admit"
//!   rather than failing requests (availability over strictness)
//! - **Best-effort caching**: every cache error converts to a miss or no-op;
//!   the cache can never fail a wrapped operation
//! - **Namespaced invalidation**: incremental scan-and-delete so invalidating
//!   a large category does not stall the store
//!
//! ## Module Organization
//!
//! - [`store`] - Resilient store connection and primitive operations
//! - [`ratelimit`] - Token-bucket, sliding-window, and fixed-window admission
//! - [`cache`] - Namespaced cache-aside service and memoization combinator
//! - [`resilience`] - Circuit breaker state machine
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cachegate::cache::{CacheCategory, CacheService};
//! use cachegate::config::CacheGateConfig;
//! use cachegate::ratelimit::RateLimiter;
//! use cachegate::store::StoreConnection;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheGateConfig::load()?;
//! let store = Arc::new(StoreConnection::new(config.store.clone()));
//! store.connect().await?;
//!
//! let limiter = RateLimiter::with_config(Arc::clone(&store), config.rate_limit.clone());
//! let cache = CacheService::new(Arc::clone(&store), config.cache.clone());
//!
//! let decision = limiter.check("user:123", 100, 60, None, None, None).await?;
//! if decision.allowed {
//!     let report: Option<String> = cache.get(CacheCategory::Predictions, "region:42").await;
//! }
//!
//! // During service shutdown
//! store.disconnect().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Degradation Semantics
//!
//! When the store is down the layer degrades to "always admit, cache misses
//! everywhere" rather than failing requests. Operators should be aware that a
//! store outage removes all rate limiting for its duration.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod ratelimit;
pub mod resilience;
pub mod store;

pub use cache::{CacheCategory, CacheService, CacheStats};
pub use config::{
    CacheConfig, CacheGateConfig, RateLimitConfig, RateLimitStrategy, StoreConfig,
};
pub use error::{Result, StoreError};
pub use ratelimit::{BucketInfo, RateLimitDecision, RateLimiter};
pub use resilience::{CircuitBreaker, CircuitBreakerMetrics, CircuitState};
pub use store::{HealthReport, HealthStatus, SetMode, StoreConnection, StoreMetrics};

//! # Store Connection Module
//!
//! The single choke point for remote key-value store access. Every other
//! component (rate limiter, cache service) delegates all network-touching work
//! to [`StoreConnection`], which owns the multiplexed connection, the circuit
//! breaker, the retry-with-backoff policy, and operation metrics. Failure
//! handling lives here and nowhere else.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cachegate::config::StoreConfig;
//! use cachegate::store::StoreConnection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StoreConnection::new(StoreConfig::default());
//! store.connect().await?;
//!
//! store.set("greeting", "hello", Some(60)).await?;
//! let value: Option<String> = store.get("greeting").await?;
//!
//! let health = store.health_check().await;
//! println!("store latency: {:?}ms", health.latency_ms);
//! # Ok(())
//! # }
//! ```

pub mod connection;

pub use connection::{
    HealthReport, HealthStatus, SetMode, StoreConnection, StoreMetrics,
};

//! # Resilience Module
//!
//! Fault isolation for the remote store connection. The circuit breaker here is
//! the mechanism that prevents pile-up of doomed calls during a store outage:
//! retries are local and bounded, and once consecutive failures cross the
//! configured threshold the circuit opens and every call fails fast until the
//! cooldown elapses.
//!
//! ## State machine
//!
//! `Closed --(max_failures consecutive failures)--> Open`
//! `Open --(open_duration elapsed)--> HalfOpen` (exactly one probe allowed)
//! `HalfOpen --(success)--> Closed`, `HalfOpen --(failure)--> Open`
//!
//! ## Usage
//!
//! ```rust
//! use cachegate::resilience::CircuitBreaker;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new("store".to_string(), 5, Duration::from_secs(60));
//!
//! if breaker.allow_request().await {
//!     // dispatch the operation, then record the outcome
//!     breaker.record_success().await;
//! }
//! # }
//! ```

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerMetrics, CircuitState};

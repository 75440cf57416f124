//! # Rate Limiter Module
//!
//! Distributed admission control built on [`StoreConnection`](crate::store::StoreConnection).
//! Three selectable algorithms share one contract: token bucket (default,
//! supports bursts), sliding window (exact, memory-heavier), and fixed window
//! (cheap, allows boundary bursts). The read-modify-write sequence for the
//! token bucket and sliding window executes as a single server-side script so
//! concurrent callers on the same key can never double-spend capacity.
//!
//! ## Failure policy
//!
//! If the store is unreachable while checking a limit, the limiter **fails
//! open**: the request is admitted and the full quota is reported, with a
//! logged warning. This is a deliberate availability-over-strictness tradeoff;
//! an outage removes all rate limiting. Operators who prioritize
//! abuse-resistance over availability should front this with a local fallback.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cachegate::config::StoreConfig;
//! use cachegate::ratelimit::RateLimiter;
//! use cachegate::store::StoreConnection;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(StoreConnection::new(StoreConfig::default()));
//! let limiter = RateLimiter::new(store);
//!
//! let decision = limiter.check("user:123", 100, 60, None, None, None).await?;
//! if !decision.allowed {
//!     println!("declined, retry after {}s", decision.retry_after_seconds);
//! }
//! # Ok(())
//! # }
//! ```

pub mod limiter;
pub mod scripts;

pub use limiter::{BucketInfo, RateLimitDecision, RateLimiter};

//! # Rate Limiter Implementation
//!
//! Per-(identifier, endpoint) admission control with selectable strategies.
//! All store access goes through the shared [`StoreConnection`]; any store
//! failure during a check converts to a fail-open decision rather than an
//! error, so an unhealthy store degrades to "always admit" instead of
//! failing requests outright.

use crate::config::{RateLimitConfig, RateLimitStrategy};
use crate::error::{Result, StoreError};
use crate::ratelimit::scripts::{SLIDING_WINDOW_SCRIPT, TOKEN_BUCKET_SCRIPT};
use crate::store::StoreConnection;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of a rate-limit check, with enough information for callers to
/// construct standard response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Configured limit for the window
    pub limit: u32,
    /// Requests still available in the current window/bucket
    pub remaining: u32,
    /// Epoch seconds when the limit fully resets
    pub reset_time: u64,
    /// Seconds the caller should wait before retrying (0 when allowed)
    pub retry_after_seconds: u64,
    pub strategy: RateLimitStrategy,
    /// True when the store was unreachable and the limiter failed open
    pub degraded: bool,
}

impl RateLimitDecision {
    /// Conventional rate-limit headers for outbound responses.
    ///
    /// `Retry-After` is only meaningful on declined requests; callers
    /// typically attach the first three on every response.
    pub fn headers(&self) -> [(&'static str, String); 4] {
        [
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_time.to_string()),
            ("Retry-After", self.retry_after_seconds.to_string()),
        ]
    }
}

/// Raw token bucket state for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    pub tokens: f64,
    /// Epoch seconds of the last refill
    pub last_refill: f64,
    pub seconds_since_refill: f64,
}

/// Distributed rate limiter with token-bucket, sliding-window, and
/// fixed-window strategies.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<StoreConnection>,
    defaults: RateLimitConfig,
}

impl RateLimiter {
    /// Create a rate limiter with default settings.
    pub fn new(store: Arc<StoreConnection>) -> Self {
        Self {
            store,
            defaults: RateLimitConfig::default(),
        }
    }

    /// Create a rate limiter with explicit defaults for `check_with_defaults`.
    pub fn with_config(store: Arc<StoreConnection>, defaults: RateLimitConfig) -> Self {
        Self { store, defaults }
    }

    fn make_key(identifier: &str, endpoint: Option<&str>) -> String {
        match endpoint {
            Some(endpoint) => format!("ratelimit:{identifier}:{endpoint}"),
            None => format!("ratelimit:{identifier}"),
        }
    }

    fn now_epoch() -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }

    /// Check whether a request should be admitted.
    ///
    /// `strategy` and `burst_size` fall back to the configured defaults when
    /// omitted. Returns `Err` only for invalid arguments; store failures are
    /// converted to a fail-open decision with `degraded = true`.
    pub async fn check(
        &self,
        identifier: &str,
        max_requests: u32,
        window_seconds: u64,
        endpoint: Option<&str>,
        strategy: Option<RateLimitStrategy>,
        burst_size: Option<u32>,
    ) -> Result<RateLimitDecision> {
        if identifier.is_empty() {
            return Err(StoreError::InvalidArgument(
                "identifier must not be empty".to_string(),
            ));
        }
        if max_requests == 0 {
            return Err(StoreError::InvalidArgument(
                "max_requests must be at least 1".to_string(),
            ));
        }
        if window_seconds == 0 {
            return Err(StoreError::InvalidArgument(
                "window_seconds must be at least 1".to_string(),
            ));
        }

        let strategy = strategy.unwrap_or(self.defaults.strategy);
        let burst_size = burst_size.or(self.defaults.burst_size);
        let key = Self::make_key(identifier, endpoint);

        let outcome = match strategy {
            RateLimitStrategy::TokenBucket => {
                self.token_bucket_check(&key, max_requests, window_seconds, burst_size)
                    .await
            }
            RateLimitStrategy::SlidingWindow => {
                self.sliding_window_check(&key, identifier, max_requests, window_seconds)
                    .await
            }
            RateLimitStrategy::FixedWindow => {
                self.fixed_window_check(&key, max_requests, window_seconds)
                    .await
            }
        };

        match outcome {
            Ok(decision) => {
                debug!(
                    identifier = %identifier,
                    strategy = strategy.as_str(),
                    allowed = decision.allowed,
                    remaining = decision.remaining,
                    "Rate limit check"
                );
                Ok(decision)
            }
            Err(e) if e.is_unavailability() => {
                warn!(
                    identifier = %identifier,
                    strategy = strategy.as_str(),
                    error = %e,
                    "Rate limit check failed, failing open"
                );
                Ok(Self::fail_open(max_requests, window_seconds, strategy))
            }
            Err(e) => Err(e),
        }
    }

    /// Check using the limiter's configured defaults.
    pub async fn check_with_defaults(
        &self,
        identifier: &str,
        endpoint: Option<&str>,
    ) -> Result<RateLimitDecision> {
        let endpoint = if self.defaults.per_endpoint {
            endpoint
        } else {
            None
        };
        self.check(
            identifier,
            self.defaults.max_requests,
            self.defaults.window_seconds,
            endpoint,
            Some(self.defaults.strategy),
            self.defaults.burst_size,
        )
        .await
    }

    fn fail_open(
        max_requests: u32,
        window_seconds: u64,
        strategy: RateLimitStrategy,
    ) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            limit: max_requests,
            remaining: max_requests,
            reset_time: Utc::now().timestamp() as u64 + window_seconds,
            retry_after_seconds: 0,
            strategy,
            degraded: true,
        }
    }

    /// Token bucket: continuous refill at `max_requests / window_seconds`
    /// tokens per second, bursts up to `burst_size` (or `max_requests`).
    /// Refill and consume execute as one atomic script.
    async fn token_bucket_check(
        &self,
        key: &str,
        max_requests: u32,
        window_seconds: u64,
        burst_size: Option<u32>,
    ) -> Result<RateLimitDecision> {
        let now = Self::now_epoch();
        let rate = max_requests as f64 / window_seconds as f64;
        let capacity = burst_size.unwrap_or(max_requests);

        let (allowed, tokens, seconds): (i64, f64, f64) = self
            .store
            .eval(
                TOKEN_BUCKET_SCRIPT,
                &[key],
                &[
                    now.to_string(),
                    rate.to_string(),
                    capacity.to_string(),
                    "1".to_string(),
                ],
            )
            .await?;

        let allowed = allowed == 1;
        Ok(RateLimitDecision {
            allowed,
            limit: max_requests,
            remaining: if allowed { tokens.floor() as u32 } else { 0 },
            reset_time: (now + seconds.max(0.0)).ceil() as u64,
            retry_after_seconds: if allowed {
                0
            } else {
                seconds.max(0.0).ceil() as u64
            },
            strategy: RateLimitStrategy::TokenBucket,
            degraded: false,
        })
    }

    /// Sliding window: prune-count-insert over a sorted set, atomic on the
    /// server. Exact enforcement; deny derives retry-after from the oldest
    /// surviving entry.
    async fn sliding_window_check(
        &self,
        key: &str,
        identifier: &str,
        max_requests: u32,
        window_seconds: u64,
    ) -> Result<RateLimitDecision> {
        let now = Self::now_epoch();
        let window_start = now - window_seconds as f64;
        let request_id = format!("{identifier}:{now}:{}", Uuid::new_v4());

        let (allowed, remaining, seconds): (i64, i64, f64) = self
            .store
            .eval(
                SLIDING_WINDOW_SCRIPT,
                &[key],
                &[
                    window_start.to_string(),
                    now.to_string(),
                    max_requests.to_string(),
                    window_seconds.to_string(),
                    request_id,
                ],
            )
            .await?;

        let allowed = allowed == 1;
        Ok(RateLimitDecision {
            allowed,
            limit: max_requests,
            remaining: remaining.max(0) as u32,
            reset_time: (now + seconds.max(0.0)).ceil() as u64,
            retry_after_seconds: if allowed {
                0
            } else {
                seconds.max(0.0).ceil() as u64
            },
            strategy: RateLimitStrategy::SlidingWindow,
            degraded: false,
        })
    }

    /// Fixed window: one counter per `(key, window_index)`. A plain atomic
    /// increment suffices; the first increment in a window sets the expiry.
    /// Allows up to `2L-1` admits across a window boundary, which is expected
    /// behavior for this strategy, not a bug.
    async fn fixed_window_check(
        &self,
        key: &str,
        max_requests: u32,
        window_seconds: u64,
    ) -> Result<RateLimitDecision> {
        let now = Utc::now().timestamp() as u64;
        let window_index = now / window_seconds;
        let window_key = format!("{key}:{window_index}");

        let count = self.store.incr(&window_key).await?;
        if count == 1 {
            // One second of slack so the key outlives its window
            self.store.expire(&window_key, window_seconds + 1).await?;
        }

        let allowed = count <= max_requests as i64;
        let reset_time = (window_index + 1) * window_seconds;
        Ok(RateLimitDecision {
            allowed,
            limit: max_requests,
            remaining: (max_requests as i64 - count).max(0) as u32,
            reset_time,
            retry_after_seconds: if allowed {
                0
            } else {
                reset_time.saturating_sub(now)
            },
            strategy: RateLimitStrategy::FixedWindow,
            degraded: false,
        })
    }

    /// Raw bucket state for an identifier, for observability. `None` when no
    /// bucket record exists.
    pub async fn get_info(
        &self,
        identifier: &str,
        endpoint: Option<&str>,
    ) -> Result<Option<BucketInfo>> {
        let key = Self::make_key(identifier, endpoint);
        let fields = self.store.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let tokens = fields
            .get("tokens")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);
        let last_refill = fields
            .get("last_refill")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(Some(BucketInfo {
            tokens,
            last_refill,
            seconds_since_refill: Self::now_epoch() - last_refill,
        }))
    }

    /// Delete all rate-limit state for an identifier, including windowed
    /// sub-keys. Used for administrative overrides.
    pub async fn reset(&self, identifier: &str, endpoint: Option<&str>) -> Result<u64> {
        let key = Self::make_key(identifier, endpoint);
        let mut deleted = self.store.del(&[key.as_str()]).await?;

        // Fixed-window counters live under "{key}:{window_index}"
        let pattern = format!("{key}:*");
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys) = self.store.scan_match(cursor, &pattern, 100).await?;
            if !keys.is_empty() {
                deleted += self.store.del(&keys).await?;
            }
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        info!(identifier = %identifier, deleted = deleted, "Rate limit reset");
        Ok(deleted)
    }
}

//! # Circuit Breaker Implementation
//!
//! Classic three-state circuit breaker guarding the remote store: Closed
//! (normal operation), Open (failing fast), and HalfOpen (testing recovery
//! with a single probe). State transitions are driven exclusively by the
//! owning `StoreConnection` recording successes and failures; the breaker is
//! never shared between connection instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without dispatching
    Open = 1,
    /// Testing recovery - a single probe call is in flight
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

/// Metrics snapshot for monitoring circuit breaker behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub consecutive_failures: u32,
    pub current_state: CircuitState,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerInner {
    /// When the circuit last opened, for cooldown calculations
    opened_at: Option<Instant>,
    /// When the current half-open probe was granted; lets a fresh probe be
    /// issued if the holder never reports an outcome (cancelled await)
    probe_granted_at: Option<Instant>,
    total_calls: u64,
    success_count: u64,
    failure_count: u64,
    consecutive_failures: u32,
    last_failure_at: Option<DateTime<Utc>>,
}

/// Core circuit breaker with atomic state reads and mutex-guarded bookkeeping
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    /// Consecutive failures that trip the circuit
    max_failures: u32,

    /// Cooldown before a half-open probe is allowed
    open_duration: Duration,

    /// Current circuit state (atomic for cheap reads)
    state: AtomicU8,

    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in the Closed state.
    pub fn new(name: String, max_failures: u32, open_duration: Duration) -> Self {
        info!(
            component = %name,
            max_failures = max_failures,
            open_duration_seconds = open_duration.as_secs(),
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            max_failures,
            open_duration,
            state: AtomicU8::new(CircuitState::Closed as u8),
            inner: Mutex::new(BreakerInner {
                opened_at: None,
                probe_granted_at: None,
                total_calls: 0,
                success_count: 0,
                failure_count: 0,
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether a call may be dispatched right now.
    ///
    /// In the Open state this also performs the cooldown check: once
    /// `open_duration` has elapsed the circuit transitions to HalfOpen and the
    /// caller that observed the transition is granted the single probe. Other
    /// callers arriving while the probe is outstanding are rejected. A probe
    /// whose holder never reports an outcome (a cancelled await) goes stale
    /// after `open_duration` and a fresh probe is granted.
    pub async fn allow_request(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let mut inner = self.inner.lock().await;
                // Re-check under the lock so only one caller wins the probe
                if self.state() != CircuitState::Open {
                    return self.state() == CircuitState::Closed;
                }
                match inner.opened_at {
                    Some(opened) if opened.elapsed() >= self.open_duration => {
                        self.state
                            .store(CircuitState::HalfOpen as u8, Ordering::Release);
                        inner.opened_at = None;
                        inner.probe_granted_at = Some(Instant::now());
                        info!(component = %self.name, "🟡 Circuit breaker half-open (probing recovery)");
                        true
                    }
                    Some(_) => false,
                    None => {
                        warn!(component = %self.name, "Circuit open but no timestamp recorded");
                        true
                    }
                }
            }
            CircuitState::HalfOpen => {
                let mut inner = self.inner.lock().await;
                if self.state() != CircuitState::HalfOpen {
                    return self.state() == CircuitState::Closed;
                }
                match inner.probe_granted_at {
                    // The outstanding probe never reported back; hand the
                    // probe to this caller instead
                    Some(granted) if granted.elapsed() >= self.open_duration => {
                        inner.probe_granted_at = Some(Instant::now());
                        warn!(component = %self.name, "🟡 Half-open probe went stale, granting a new probe");
                        true
                    }
                    Some(_) => false,
                    None => {
                        inner.probe_granted_at = Some(Instant::now());
                        true
                    }
                }
            }
        }
    }

    /// Record a successful operation
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.total_calls += 1;
        inner.success_count += 1;
        inner.consecutive_failures = 0;

        if self.state() == CircuitState::HalfOpen {
            self.state
                .store(CircuitState::Closed as u8, Ordering::Release);
            inner.opened_at = None;
            inner.probe_granted_at = None;
            info!(
                component = %self.name,
                total_calls = inner.total_calls,
                "🟢 Circuit breaker closed (recovered)"
            );
        } else {
            debug!(component = %self.name, "🟢 Operation succeeded");
        }
    }

    /// Record a failed operation
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.total_calls += 1;
        inner.failure_count += 1;
        inner.consecutive_failures += 1;
        inner.last_failure_at = Some(Utc::now());

        match self.state() {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.max_failures {
                    self.open_locked(&mut inner);
                }
            }
            // Any failure during the probe immediately re-opens the circuit
            CircuitState::HalfOpen => self.open_locked(&mut inner),
            CircuitState::Open => {
                debug!(component = %self.name, "Failure recorded while circuit already open");
            }
        }
    }

    fn open_locked(&self, inner: &mut BreakerInner) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        inner.opened_at = Some(Instant::now());
        inner.probe_granted_at = None;
        warn!(
            component = %self.name,
            consecutive_failures = inner.consecutive_failures,
            max_failures = self.max_failures,
            open_duration_seconds = self.open_duration.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    /// Reset to Closed after a verified successful reconnect.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let was = self.state();
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        inner.opened_at = None;
        inner.probe_granted_at = None;
        inner.consecutive_failures = 0;
        if was != CircuitState::Closed {
            info!(component = %self.name, "🟢 Circuit breaker reset after reconnect");
        }
    }

    /// Force circuit to open state (administrative override)
    pub async fn force_open(&self) {
        let mut inner = self.inner.lock().await;
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        inner.opened_at = Some(Instant::now());
        inner.probe_granted_at = None;
    }

    /// Force circuit to closed state (administrative override)
    pub async fn force_closed(&self) {
        let mut inner = self.inner.lock().await;
        warn!(component = %self.name, "🚨 Circuit breaker forced closed");
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        inner.opened_at = None;
        inner.probe_granted_at = None;
        inner.consecutive_failures = 0;
    }

    /// Get current metrics snapshot
    pub async fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock().await;
        CircuitBreakerMetrics {
            total_calls: inner.total_calls,
            success_count: inner.success_count,
            failure_count: inner.failure_count,
            consecutive_failures: inner.consecutive_failures,
            current_state: self.state(),
            last_failure_at: inner.last_failure_at,
        }
    }

    /// Consecutive failure count since the last success
    pub async fn consecutive_failures(&self) -> u32 {
        self.inner.lock().await.consecutive_failures
    }
}

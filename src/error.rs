//! # Structured Error Handling
//!
//! Error taxonomy for the caching and rate-limiting layer. The split that matters
//! operationally is transient vs. non-retryable: transient errors are retried with
//! backoff inside `StoreConnection` and feed the circuit breaker, while
//! non-retryable errors (bad arguments, serialization failures, store-side command
//! errors) propagate immediately without touching circuit state.

use std::time::Duration;

/// Errors produced by the store connection and the services built on it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Circuit breaker is open; no network attempt was made.
    #[error("circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Transient store failure that survived the full retry budget.
    #[error("store unavailable after {attempts} attempts during {operation}: {source}")]
    Unavailable {
        operation: String,
        attempts: u32,
        #[source]
        source: redis::RedisError,
    },

    /// A single dispatch exceeded the per-operation timeout.
    #[error("operation {operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    /// No connection has been established (or it was explicitly released).
    #[error("store connection not established")]
    NotConnected,

    /// Store rejected the command itself. Not retried: this indicates a
    /// programming error, not store unhealthiness.
    #[error("store rejected command: {0}")]
    Command(#[source] redis::RedisError),

    /// Payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller passed an argument the layer cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Whether this error represents store unhealthiness rather than a caller bug.
    ///
    /// Circuit-open and post-retry unavailability both read as "the store cannot
    /// be reached right now"; callers with a degradation policy (fail-open rate
    /// limiting, best-effort caching) key off this.
    pub fn is_unavailability(&self) -> bool {
        matches!(
            self,
            StoreError::CircuitOpen { .. }
                | StoreError::Unavailable { .. }
                | StoreError::Timeout { .. }
                | StoreError::NotConnected
        )
    }
}

/// Classify a driver error as transient (worth retrying / circuit-relevant).
pub(crate) fn is_transient(error: &redis::RedisError) -> bool {
    error.is_io_error()
        || error.is_timeout()
        || error.is_connection_refusal()
        || error.is_connection_dropped()
        || error.is_cluster_error()
}

pub type Result<T> = std::result::Result<T, StoreError>;

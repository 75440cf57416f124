//! Circuit breaker lifecycle: threshold, cooldown, probe, recovery.

use cachegate::resilience::{CircuitBreaker, CircuitState};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn test_full_lifecycle_closed_open_half_open_closed() {
    let circuit = CircuitBreaker::new("lifecycle".to_string(), 3, Duration::from_millis(80));

    // Closed: calls allowed, failures accumulate
    assert_eq!(circuit.state(), CircuitState::Closed);
    for _ in 0..2 {
        assert!(circuit.allow_request().await);
        circuit.record_failure().await;
    }
    assert_eq!(circuit.state(), CircuitState::Closed);

    // Third consecutive failure opens the circuit
    circuit.record_failure().await;
    assert_eq!(circuit.state(), CircuitState::Open);

    // Before the cooldown elapses every call is rejected
    assert!(!circuit.allow_request().await);
    sleep(Duration::from_millis(30)).await;
    assert!(!circuit.allow_request().await);

    // After the cooldown exactly one probe goes through
    sleep(Duration::from_millis(60)).await;
    assert!(circuit.allow_request().await);
    assert_eq!(circuit.state(), CircuitState::HalfOpen);
    assert!(!circuit.allow_request().await);

    // Probe success closes the circuit and resets the failure count
    circuit.record_success().await;
    assert_eq!(circuit.state(), CircuitState::Closed);
    assert_eq!(circuit.metrics().await.consecutive_failures, 0);
}

#[tokio::test]
async fn test_failed_probe_restarts_cooldown() {
    let circuit = CircuitBreaker::new("probe".to_string(), 1, Duration::from_millis(60));

    circuit.record_failure().await;
    assert_eq!(circuit.state(), CircuitState::Open);

    sleep(Duration::from_millis(70)).await;
    assert!(circuit.allow_request().await);
    circuit.record_failure().await;
    assert_eq!(circuit.state(), CircuitState::Open);

    // Fresh cooldown: still rejected right after the failed probe
    assert!(!circuit.allow_request().await);
    sleep(Duration::from_millis(70)).await;
    assert!(circuit.allow_request().await);
}

#[tokio::test]
async fn test_metrics_track_outcomes() {
    let circuit = CircuitBreaker::new("metrics".to_string(), 5, Duration::from_secs(60));

    circuit.record_success().await;
    circuit.record_success().await;
    circuit.record_failure().await;

    let metrics = circuit.metrics().await;
    assert_eq!(metrics.total_calls, 3);
    assert_eq!(metrics.success_count, 2);
    assert_eq!(metrics.failure_count, 1);
    assert_eq!(metrics.consecutive_failures, 1);
    assert_eq!(metrics.current_state, CircuitState::Closed);
    assert!(metrics.last_failure_at.is_some());
}

#[tokio::test]
async fn test_concurrent_probes_admit_exactly_one() {
    use std::sync::Arc;

    let circuit = Arc::new(CircuitBreaker::new(
        "race".to_string(),
        1,
        Duration::from_millis(40),
    ));
    circuit.record_failure().await;
    sleep(Duration::from_millis(50)).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let circuit = Arc::clone(&circuit);
        handles.push(tokio::spawn(async move { circuit.allow_request().await }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1, "exactly one caller should win the probe");
}

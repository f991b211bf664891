//! Tests for health check metrics

use super::metrics::{create_metrics, HealthMetrics};
use crate::health::State;

#[test]
fn test_metrics_creation() {
    let metrics = HealthMetrics::new().expect("should create metrics");

    // Record some values so metrics appear in output
    // (Prometheus only outputs metrics with values)
    metrics.record_invocation("context", None, State::Up, 0.001);
    metrics.record_transition("context");

    let output = metrics.encode().expect("should encode metrics");
    assert!(output.contains("vigil_health_check_invocations_total"));
    assert!(output.contains("vigil_health_check_duration_seconds"));
    assert!(output.contains("vigil_health_check_state"));
    assert!(output.contains("vigil_health_check_transitions_total"));
}

#[test]
fn test_record_invocation() {
    let metrics = HealthMetrics::new().expect("should create metrics");

    metrics.record_invocation("route:a", Some("camel"), State::Up, 0.01);
    metrics.record_invocation("route:a", Some("camel"), State::Up, 0.02);
    metrics.record_invocation("route:a", Some("camel"), State::Down, 0.03);

    let output = metrics.encode().expect("should encode metrics");

    assert!(output
        .contains("vigil_health_check_invocations_total{check=\"route:a\",state=\"UP\"} 2"));
    assert!(output
        .contains("vigil_health_check_invocations_total{check=\"route:a\",state=\"DOWN\"} 1"));
    assert!(output.contains("vigil_health_check_duration_seconds_count{group=\"camel\"} 3"));
    assert!(output.contains("vigil_health_check_state{check=\"route:a\"} 0"));
}

#[test]
fn test_ungrouped_and_unknown_state() {
    let metrics = HealthMetrics::new().expect("should create metrics");

    metrics.record_invocation("context", None, State::Unknown, 0.0);

    let output = metrics.encode().expect("should encode metrics");
    assert!(output.contains("vigil_health_check_duration_seconds_count{group=\"none\"} 1"));
    assert!(output.contains("vigil_health_check_state{check=\"context\"} -1"));
}

#[test]
fn test_record_transition() {
    let metrics = create_metrics().expect("should create metrics");

    metrics.record_transition("db");
    metrics.record_transition("db");

    let output = metrics.encode().expect("should encode metrics");
    assert!(output.contains("vigil_health_check_transitions_total{check=\"db\"} 2"));
}

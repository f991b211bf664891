//! Prometheus metrics for health checks
//!
//! Exposes check activity:
//! - Invocation counts by resulting state
//! - Invocation durations per group
//! - Last observed state per check
//! - State transitions seen by the service

use crate::health::State;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Group label used for checks without a group
const UNGROUPED: &str = "none";

/// Health check metrics registry
///
/// Thread-safe container for all Prometheus metrics.
/// Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct HealthMetrics {
    registry: Registry,
    /// Check invocations by check id and resulting state
    pub invocations_total: IntCounterVec,
    /// Check invocation duration in seconds
    pub invocation_duration_seconds: HistogramVec,
    /// Last state per check (1 up, 0 down, -1 unknown)
    pub check_state: IntGaugeVec,
    /// State transitions per check
    pub transitions_total: IntCounterVec,
}

impl HealthMetrics {
    /// Create a new metrics registry with all health check metrics
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let invocations_total = IntCounterVec::new(
            Opts::new(
                "vigil_health_check_invocations_total",
                "Total number of health check invocations",
            ),
            &["check", "state"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let invocation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "vigil_health_check_duration_seconds",
                "Duration of health check invocations in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["group"],
        )?;
        registry.register(Box::new(invocation_duration_seconds.clone()))?;

        let check_state = IntGaugeVec::new(
            Opts::new(
                "vigil_health_check_state",
                "Last observed state per check (1 up, 0 down, -1 unknown)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_state.clone()))?;

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "vigil_health_check_transitions_total",
                "Total number of observed health check state transitions",
            ),
            &["check"],
        )?;
        registry.register(Box::new(transitions_total.clone()))?;

        Ok(Self {
            registry,
            invocations_total,
            invocation_duration_seconds,
            check_state,
            transitions_total,
        })
    }

    /// Record one check invocation
    pub fn record_invocation(
        &self,
        check: &str,
        group: Option<&str>,
        state: State,
        duration_secs: f64,
    ) {
        self.invocations_total
            .with_label_values(&[check, state.as_str()])
            .inc();
        self.invocation_duration_seconds
            .with_label_values(&[group.unwrap_or(UNGROUPED)])
            .observe(duration_secs);
        let value = match state {
            State::Up => 1,
            State::Down => 0,
            State::Unknown => -1,
        };
        self.check_state.with_label_values(&[check]).set(value);
    }

    /// Record a state transition of a check
    pub fn record_transition(&self, check: &str) {
        self.transitions_total.with_label_values(&[check]).inc();
    }

    /// Encode all metrics to Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
        })
    }
}

/// Shared metrics handle
pub type SharedMetrics = Arc<HealthMetrics>;

/// Create a new shared metrics instance
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(HealthMetrics::new()?))
}

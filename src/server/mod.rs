//! HTTP server for health endpoints
//!
//! Provides health probes and metrics:
//! - `/healthz` - Liveness checks
//! - `/readyz` - Readiness checks
//! - `/health` - Last results cached by the health check service
//! - `/metrics` - Prometheus metrics

mod health;
mod metrics;

pub use health::{render_results, run_health_server, HealthServerState};
pub use metrics::{create_metrics, HealthMetrics, SharedMetrics};

use tokio::sync::watch;

/// Sender side of a shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

/// Receiver side of a shutdown signal
///
/// Cloneable; every clone observes the same trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown was triggered (or the trigger was dropped)
    pub async fn wait(&mut self) {
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }
}

/// Create a connected trigger/signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger { sender }, ShutdownSignal { receiver })
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_tests;

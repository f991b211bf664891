//! Health check endpoints
//!
//! - `/healthz` - Liveness: invokes every liveness check
//! - `/readyz` - Readiness: invokes every readiness check
//! - `/health` - Last results polled by the health check service
//! - `/metrics` - Prometheus text format

use super::{SharedMetrics, ShutdownSignal};
use crate::config::ExposureLevel;
use crate::health::helper::{self, Kind};
use crate::health::{HealthCheckRegistry, HealthCheckResult, HealthCheckService, Options};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared state for the health endpoints
#[derive(Clone)]
pub struct HealthServerState {
    registry: Arc<HealthCheckRegistry>,
    service: Arc<HealthCheckService>,
    metrics: SharedMetrics,
    exposure: ExposureLevel,
}

impl HealthServerState {
    pub fn new(
        registry: Arc<HealthCheckRegistry>,
        service: Arc<HealthCheckService>,
        metrics: SharedMetrics,
        exposure: ExposureLevel,
    ) -> Self {
        Self {
            registry,
            service,
            metrics,
            exposure,
        }
    }
}

/// Render results as a JSON document at the given exposure level
///
/// `status` is the aggregate of all results.
pub fn render_results(results: &[HealthCheckResult], exposure: ExposureLevel) -> Value {
    let status = helper::aggregate(results);
    if exposure == ExposureLevel::Oneline {
        return json!({ "status": status });
    }

    let checks: Vec<Value> = results
        .iter()
        .map(|result| {
            let mut check = Map::new();
            check.insert("name".into(), json!(result.check().id()));
            check.insert("status".into(), json!(result.state()));

            let failing = result.state() != crate::health::State::Up;
            if exposure == ExposureLevel::Full || failing {
                if let Some(message) = result.message() {
                    check.insert("message".into(), json!(message));
                }
                if let Some(error) = result.error() {
                    check.insert("error".into(), json!(error));
                }
            }
            if exposure == ExposureLevel::Full {
                if let Some(group) = result.check().group() {
                    check.insert("group".into(), json!(group));
                }
                check.insert("details".into(), json!(result.details()));
            }
            Value::Object(check)
        })
        .collect();

    json!({ "status": status, "checks": checks })
}

fn probe_response(
    results: &[HealthCheckResult],
    exposure: ExposureLevel,
) -> (StatusCode, Json<Value>) {
    let code = match helper::aggregate(results) {
        crate::health::State::Up => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(render_results(results, exposure)))
}

/// Liveness probe handler
///
/// 200 OK when every liveness check is UP, 503 otherwise.
async fn healthz(State(state): State<HealthServerState>) -> (StatusCode, Json<Value>) {
    let results = helper::invoke(&state.registry, Kind::Liveness, &Options::new()).await;
    probe_response(&results, state.exposure)
}

/// Readiness probe handler
///
/// 200 OK when every readiness check is UP, 503 otherwise.
async fn readyz(State(state): State<HealthServerState>) -> (StatusCode, Json<Value>) {
    let results = helper::invoke(&state.registry, Kind::Readiness, &Options::new()).await;
    probe_response(&results, state.exposure)
}

/// Cached results from the last scheduled tick
async fn health(State(state): State<HealthServerState>) -> (StatusCode, Json<Value>) {
    let results = state.service.results().await;
    probe_response(&results, state.exposure)
}

async fn metrics_handler(State(state): State<HealthServerState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        warn!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Run the health server on the specified port
///
/// Serves until `shutdown` fires, then drains in-flight requests.
pub async fn run_health_server(
    port: u16,
    state: HealthServerState,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = %port, "Health server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
        .map_err(std::io::Error::other)?;

    info!("Health server stopped");
    Ok(())
}

use std::sync::Arc;
use tracing::{info, warn};
use vigil::config::HealthConfig;
use vigil::health::checks::{
    ConsumersHealthCheckRepository, ContextHealthCheck, RouteControllerHealthCheck,
    RoutesHealthCheckRepository,
};
use vigil::health::{
    HealthCheck, HealthCheckRegistry, HealthCheckService, Registrable, State, StateChangeListener,
};
use vigil::runtime::RuntimeContext;
use vigil::server::{create_metrics, run_health_server, shutdown_channel, HealthServerState};

/// Logs every state transition observed by the service
///
/// DOWN transitions are logged at `warn!`, everything else at `info!`.
struct LoggingListener;

impl StateChangeListener for LoggingListener {
    fn on_state_change(&self, state: State, check: &dyn HealthCheck) {
        match state {
            State::Down => warn!(check = %check.id(), state = %state, "Health check is DOWN"),
            _ => info!(check = %check.id(), state = %state, "Health check state changed"),
        }
    }
}

/// Register the built-in checks and repositories for `context`
fn build_registry(context: &Arc<RuntimeContext>, config: &HealthConfig) -> HealthCheckRegistry {
    let registry = HealthCheckRegistry::new(context.clone());

    registry.register(Registrable::Check(Arc::new(ContextHealthCheck::new(context))));
    registry.register(Registrable::Check(Arc::new(
        RouteControllerHealthCheck::new(context),
    )));
    registry.register(Registrable::Repository(Arc::new(
        RoutesHealthCheckRepository::new(context)
            .with_exclusions(config.excluded_routes.iter().cloned()),
    )));
    registry.register(Registrable::Repository(Arc::new(
        ConsumersHealthCheckRepository::new(context),
    )));
    registry.set_enabled(config.registry_enabled);

    registry
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting VIGIL health check service");

    let config = HealthConfig::from_env()?;
    info!(
        port = config.port,
        interval_ms = config.check_interval.as_millis() as u64,
        timeout_ms = config.check_timeout.as_millis() as u64,
        registry_enabled = config.registry_enabled,
        exposure = ?config.exposure_level,
        "Configuration loaded"
    );

    let context = Arc::new(RuntimeContext::new("vigil"));
    let registry = Arc::new(build_registry(&context, &config));

    let metrics = create_metrics()?;
    let service = Arc::new(
        HealthCheckService::new(Some(registry.clone()), config.service_config())
            .with_metrics(metrics.clone()),
    );
    service
        .add_state_change_listener(Arc::new(LoggingListener))
        .await;

    context.start();
    service.start();

    // Start health server in background
    let (shutdown, signal) = shutdown_channel();
    let state = HealthServerState::new(
        registry.clone(),
        service.clone(),
        metrics,
        config.exposure_level,
    );
    let port = config.port;
    let server = tokio::spawn(async move {
        if let Err(e) = run_health_server(port, state, signal).await {
            warn!(error = %e, "Health server failed");
        }
    });
    info!(port = port, "Health server task spawned");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    service.stop();
    context.stop();
    shutdown.trigger();
    let _ = server.await;

    info!("VIGIL stopped");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

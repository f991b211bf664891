use super::*;
use vigil::runtime::{Consumer, Route};

fn context_with_routes() -> Arc<RuntimeContext> {
    let context = Arc::new(RuntimeContext::new("main-test"));
    context.add_route(Arc::new(Route::new("orders")));
    context.add_route(Arc::new(Route::new("timer-tick")));
    context.add_route(Arc::new(
        Route::new("poller").with_consumer(Consumer::new("file:inbox").with_health_enabled(true)),
    ));
    context
}

#[test]
fn test_build_registry_registers_builtin_checks() {
    let context = context_with_routes();

    let registry = build_registry(&context, &HealthConfig::default());

    let ids = registry.check_ids();
    assert!(ids.contains(&"context".to_string()));
    assert!(ids.contains(&"route-controller".to_string()));
    assert!(ids.contains(&"route:orders".to_string()));
    assert!(ids.contains(&"route:timer-tick".to_string()));
    assert!(ids.contains(&"consumer:poller".to_string()));
    assert!(registry.repository("routes").is_some());
    assert!(registry.repository("consumers").is_some());
}

#[test]
fn test_build_registry_applies_exclusions() {
    let context = context_with_routes();
    let config = HealthConfig {
        excluded_routes: vec!["timer-*".to_string()],
        ..HealthConfig::default()
    };

    let registry = build_registry(&context, &config);

    let ids = registry.check_ids();
    assert!(ids.contains(&"route:orders".to_string()));
    assert!(!ids.contains(&"route:timer-tick".to_string()));
}

#[test]
fn test_build_registry_disabled_streams_nothing() {
    let context = context_with_routes();
    let config = HealthConfig {
        registry_enabled: false,
        ..HealthConfig::default()
    };

    let registry = build_registry(&context, &config);

    assert!(!registry.is_enabled());
    assert!(registry.stream().is_empty());
}

#[tokio::test]
async fn test_logging_listener_receives_transitions() {
    let context = Arc::new(RuntimeContext::new("listener"));
    let registry = Arc::new(build_registry(&context, &HealthConfig::default()));
    let service = HealthCheckService::new(Some(registry), Default::default());
    service
        .add_state_change_listener(Arc::new(LoggingListener))
        .await;

    let down = service.call("context").await.expect("context is registered");
    assert_eq!(down.state(), State::Down);

    context.start();
    let up = service.call("context").await.expect("context is registered");
    assert_eq!(up.state(), State::Up);
}

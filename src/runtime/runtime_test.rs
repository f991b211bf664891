//! Tests for the runtime model

use super::*;
use std::sync::Arc;

#[test]
fn test_context_start_and_stop() {
    let ctx = RuntimeContext::new("test");
    assert_eq!(ctx.status(), ServiceStatus::Initialized);
    assert!(ctx.uptime().is_none());

    ctx.start();
    assert!(ctx.status().is_started());
    assert!(ctx.uptime().is_some());

    ctx.stop();
    assert_eq!(ctx.status(), ServiceStatus::Stopped);
    assert!(ctx.uptime().is_none());
}

#[test]
fn test_add_route_replaces_same_id() {
    let ctx = RuntimeContext::new("test");
    ctx.add_route(Arc::new(Route::new("orders")));
    ctx.add_route(Arc::new(
        Route::new("orders").with_status(ServiceStatus::Started),
    ));

    assert_eq!(ctx.routes().len(), 1);
    assert_eq!(
        ctx.route("orders").map(|r| r.status()),
        Some(ServiceStatus::Started)
    );
    assert!(ctx.remove_route("orders"));
    assert!(!ctx.remove_route("orders"));
}

#[test]
fn test_consumer_poll_bookkeeping() {
    let consumer = Consumer::new("timer:tick");

    consumer.record_poll_error("connection refused");
    consumer.record_poll_error("connection refused");
    assert_eq!(consumer.consecutive_errors(), 2);
    assert_eq!(consumer.last_error().as_deref(), Some("connection refused"));

    consumer.record_poll_success();
    assert_eq!(consumer.poll_count(), 3);
    assert_eq!(consumer.consecutive_errors(), 0);
    assert!(consumer.last_error().is_none());
}

#[test]
fn test_route_controller_exhausted_routes_sorted() {
    let controller = SupervisingRouteController::new();
    controller.mark_exhausted("b");
    controller.mark_exhausted("a");
    assert_eq!(controller.exhausted_routes(), vec!["a", "b"]);

    controller.clear_exhausted("a");
    assert_eq!(controller.exhausted_routes(), vec!["b"]);
}

#[test]
fn test_status_display_names() {
    assert_eq!(ServiceStatus::Started.to_string(), "Started");
    assert_eq!(ServiceStatus::Suspending.as_str(), "Suspending");
    assert!(!ServiceStatus::Suspended.is_started());
}

use super::{Route, ServiceStatus};
use crate::health::{HealthCheck, HealthCheckResultStrategy};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::info;

/// Route controller that starts routes in the background and restarts failed ones
///
/// Routes that used up their restart attempts are tracked as exhausted.
#[derive(Debug, Default)]
pub struct SupervisingRouteController {
    starting_routes: AtomicBool,
    exhausted: RwLock<BTreeSet<String>>,
}

impl SupervisingRouteController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_starting_routes(&self, starting: bool) {
        self.starting_routes.store(starting, Ordering::SeqCst);
    }

    /// Whether the controller is still starting routes
    pub fn is_starting_routes(&self) -> bool {
        self.starting_routes.load(Ordering::SeqCst)
    }

    pub fn mark_exhausted(&self, route_id: &str) {
        self.exhausted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(route_id.to_string());
    }

    pub fn clear_exhausted(&self, route_id: &str) {
        self.exhausted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(route_id);
    }

    /// Ids of routes that exhausted their restart attempts, sorted
    pub fn exhausted_routes(&self) -> Vec<String> {
        self.exhausted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// The hosting runtime that health checks observe
///
/// Owned by the composition root and shared as `Arc<RuntimeContext>`.
/// Checks keep only a weak reference back to it, so checks stored in the
/// bean registry do not keep the context alive.
pub struct RuntimeContext {
    name: String,
    status: RwLock<ServiceStatus>,
    started_at: RwLock<Option<DateTime<Utc>>>,
    routes: RwLock<Vec<Arc<Route>>>,
    health_check_beans: RwLock<Vec<Arc<dyn HealthCheck>>>,
    result_strategy: RwLock<Option<Arc<dyn HealthCheckResultStrategy>>>,
    route_controller: RwLock<Option<Arc<SupervisingRouteController>>>,
}

impl RuntimeContext {
    /// Create a context in the `Initialized` state
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RwLock::new(ServiceStatus::Initialized),
            started_at: RwLock::new(None),
            routes: RwLock::new(Vec::new()),
            health_check_beans: RwLock::new(Vec::new()),
            result_strategy: RwLock::new(None),
            route_controller: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ServiceStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: ServiceStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Mark the context started and record the start time
    pub fn start(&self) {
        *self
            .started_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        self.set_status(ServiceStatus::Started);
        info!(context = %self.name, "Runtime context started");
    }

    pub fn stop(&self) {
        self.set_status(ServiceStatus::Stopped);
        *self
            .started_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        info!(context = %self.name, "Runtime context stopped");
    }

    /// Time since `start()`, if the context is running
    pub fn uptime(&self) -> Option<Duration> {
        let started_at = (*self.started_at.read().unwrap_or_else(PoisonError::into_inner))?;
        (Utc::now() - started_at).to_std().ok()
    }

    /// Add a route, replacing any existing route with the same id
    pub fn add_route(&self, route: Arc<Route>) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        routes.retain(|r| r.id() != route.id());
        routes.push(route);
    }

    pub fn remove_route(&self, route_id: &str) -> bool {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let before = routes.len();
        routes.retain(|r| r.id() != route_id);
        routes.len() != before
    }

    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn route(&self, route_id: &str) -> Option<Arc<Route>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.id() == route_id)
            .cloned()
    }

    /// Store a health check in the bean registry
    ///
    /// Bean checks are surfaced by the registry's built-in repository.
    pub fn bind_health_check(&self, check: Arc<dyn HealthCheck>) {
        let mut beans = self
            .health_check_beans
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        beans.retain(|c| c.id() != check.id());
        beans.push(check);
    }

    pub fn health_check_beans(&self) -> Vec<Arc<dyn HealthCheck>> {
        self.health_check_beans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn health_check_bean(&self, id: &str) -> Option<Arc<dyn HealthCheck>> {
        self.health_check_beans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    pub fn set_result_strategy(&self, strategy: Option<Arc<dyn HealthCheckResultStrategy>>) {
        *self
            .result_strategy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = strategy;
    }

    pub fn result_strategy(&self) -> Option<Arc<dyn HealthCheckResultStrategy>> {
        self.result_strategy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_route_controller(&self, controller: Option<Arc<SupervisingRouteController>>) {
        *self
            .route_controller
            .write()
            .unwrap_or_else(PoisonError::into_inner) = controller;
    }

    /// The supervising route controller, if routes are supervised
    pub fn route_controller(&self) -> Option<Arc<SupervisingRouteController>> {
        self.route_controller
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

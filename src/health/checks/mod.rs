//! Built-in checks and repositories
//!
//! - `ContextHealthCheck` - runtime context status, always invoked first
//! - `RouteControllerHealthCheck` - supervised route startup (readiness only)
//! - `RoutesHealthCheckRepository` - one `RouteHealthCheck` per route
//! - `ConsumersHealthCheckRepository` - one `ConsumerHealthCheck` per health-aware consumer
//! - `ContextRegistryRepository` - checks bound in the context's bean registry

mod consumers;
mod context;
mod registry_repository;
mod route_controller;
mod routes;

pub use consumers::{ConsumerHealthCheck, ConsumersHealthCheckRepository, CONSUMERS_REPOSITORY_ID};
pub use context::{ContextHealthCheck, CONTEXT_CHECK_ID};
pub use registry_repository::{ContextRegistryRepository, REGISTRY_REPOSITORY_ID};
pub use route_controller::{RouteControllerHealthCheck, ROUTE_CONTROLLER_CHECK_ID};
pub use routes::{RouteHealthCheck, RoutesHealthCheckRepository, ROUTES_REPOSITORY_ID};

use super::HealthCheck;
use crate::runtime::Route;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Group shared by route-scoped checks
pub const ROUTE_CHECK_GROUP: &str = "camel";

/// Per-route check instances kept across repository calls
///
/// Entries for removed routes are dropped; a route replaced under the same
/// id gets a fresh check.
#[derive(Default)]
struct RouteCheckCache {
    entries: Mutex<HashMap<String, (Arc<Route>, Arc<dyn HealthCheck>)>>,
}

impl RouteCheckCache {
    fn refresh<F>(&self, routes: &[Arc<Route>], make: F) -> Vec<Arc<dyn HealthCheck>>
    where
        F: Fn(&Arc<Route>) -> Arc<dyn HealthCheck>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|id, _| routes.iter().any(|r| r.id() == id));

        routes
            .iter()
            .map(|route| {
                let entry = entries
                    .entry(route.id().to_string())
                    .or_insert_with(|| (route.clone(), make(route)));
                if !Arc::ptr_eq(&entry.0, route) {
                    *entry = (route.clone(), make(route));
                }
                entry.1.clone()
            })
            .collect()
    }
}

/// Match `value` against a pattern where `*` stands for any run of characters
pub fn matches_pattern(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !value.starts_with(first) || value.len() < first.len() + last.len() {
        return false;
    }

    let mut rest = &value[first.len()..];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[cfg(test)]
#[path = "checks_test.rs"]
mod tests;

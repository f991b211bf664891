//! In-process model of the hosting runtime
//!
//! Health checks read their observations from here:
//! - `RuntimeContext` - lifecycle status, routes and the bean registry
//! - `Route` / `Consumer` - per-route status and poll bookkeeping
//! - `SupervisingRouteController` - startup and restart state of supervised routes

mod context;
mod route;

pub use context::{RuntimeContext, SupervisingRouteController};
pub use route::{Consumer, Route};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by the context and its routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceStatus {
    Initializing,
    Initialized,
    Starting,
    Started,
    Stopping,
    Stopped,
    Suspending,
    Suspended,
}

impl ServiceStatus {
    pub fn is_started(&self) -> bool {
        matches!(self, ServiceStatus::Started)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Initializing => "Initializing",
            ServiceStatus::Initialized => "Initialized",
            ServiceStatus::Starting => "Starting",
            ServiceStatus::Started => "Started",
            ServiceStatus::Stopping => "Stopping",
            ServiceStatus::Stopped => "Stopped",
            ServiceStatus::Suspending => "Suspending",
            ServiceStatus::Suspended => "Suspended",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;

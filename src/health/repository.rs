use super::HealthCheck;
use std::sync::Arc;

/// A named source of health checks
///
/// Repositories produce checks dynamically, e.g. one per live route.
/// Implementations should hand out the same check instance for the same
/// subject across calls so per-check counters survive between ticks.
pub trait HealthCheckRepository: Send + Sync {
    fn id(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    fn checks(&self) -> Vec<Arc<dyn HealthCheck>>;
}

use crate::health::{HealthCheck, HealthCheckRepository};
use crate::runtime::RuntimeContext;
use std::sync::{Arc, Weak};

pub const REGISTRY_REPOSITORY_ID: &str = "registry-health-check-repository";

/// Surfaces the checks bound in the context's bean registry
pub struct ContextRegistryRepository {
    context: Weak<RuntimeContext>,
}

impl ContextRegistryRepository {
    pub fn new(context: &Arc<RuntimeContext>) -> Self {
        Self {
            context: Arc::downgrade(context),
        }
    }
}

impl HealthCheckRepository for ContextRegistryRepository {
    fn id(&self) -> &str {
        REGISTRY_REPOSITORY_ID
    }

    fn checks(&self) -> Vec<Arc<dyn HealthCheck>> {
        let Some(context) = self.context.upgrade() else {
            return Vec::new();
        };

        let checks = context.health_check_beans();
        for check in &checks {
            check.base().bind_context(&context);
        }
        checks
    }
}

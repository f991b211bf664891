use crate::health::{CheckBase, HealthCheck, HealthCheckResultBuilder, Options};
use crate::runtime::RuntimeContext;
use async_trait::async_trait;
use std::sync::Arc;

pub const ROUTE_CONTROLLER_CHECK_ID: &str = "route-controller";

/// Readiness check for supervised route startup
///
/// DOWN while the supervising controller is still starting routes or
/// while routes exhausted their restart attempts. Always UP when routes
/// are not supervised.
pub struct RouteControllerHealthCheck {
    base: CheckBase,
}

impl RouteControllerHealthCheck {
    pub fn new(context: &Arc<RuntimeContext>) -> Self {
        let base = CheckBase::new(None, ROUTE_CONTROLLER_CHECK_ID)
            .with_order(i32::MIN + 1)
            .with_liveness(false);
        base.bind_context(context);
        Self { base }
    }
}

#[async_trait]
impl HealthCheck for RouteControllerHealthCheck {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    async fn do_call(&self, builder: &mut HealthCheckResultBuilder, _options: &Options) {
        let Some(context) = self.base.context() else {
            builder.unknown().message("No runtime context available");
            return;
        };

        let Some(controller) = context.route_controller() else {
            builder.up().detail("route.controller.supervising", false);
            return;
        };

        let starting = controller.is_starting_routes();
        let unhealthy = controller.exhausted_routes();
        builder
            .detail("route.controller.supervising", true)
            .detail("route.controller.starting", starting)
            .detail("route.controller.unhealthy", unhealthy.clone());

        if starting {
            builder
                .down()
                .message("Route controller is still starting routes");
        } else if !unhealthy.is_empty() {
            builder.down().message(format!(
                "Route controller has {} unhealthy route(s): {}",
                unhealthy.len(),
                unhealthy.join(", ")
            ));
        } else {
            builder.up();
        }
    }
}

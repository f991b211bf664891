use crate::health::{CheckBase, HealthCheck, HealthCheckResultBuilder, Options};
use crate::runtime::RuntimeContext;
use async_trait::async_trait;
use std::sync::Arc;

pub const CONTEXT_CHECK_ID: &str = "context";

/// Reports UP once the runtime context is started
///
/// Pinned to the lowest order so it runs before every other check.
pub struct ContextHealthCheck {
    base: CheckBase,
}

impl ContextHealthCheck {
    pub fn new(context: &Arc<RuntimeContext>) -> Self {
        let base = CheckBase::new(None, CONTEXT_CHECK_ID).with_order(i32::MIN);
        base.bind_context(context);
        Self { base }
    }
}

#[async_trait]
impl HealthCheck for ContextHealthCheck {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    async fn do_call(&self, builder: &mut HealthCheckResultBuilder, _options: &Options) {
        let Some(context) = self.base.context() else {
            builder.unknown().message("No runtime context available");
            return;
        };

        let status = context.status();
        builder
            .detail("context.name", context.name())
            .detail("context.status", status.as_str())
            .message(format!("Context {} is {}", context.name(), status));
        if let Some(uptime) = context.uptime() {
            builder.detail("context.uptime", uptime.as_millis() as u64);
        }

        if status.is_started() {
            builder.up();
        } else {
            builder.down();
        }
    }
}

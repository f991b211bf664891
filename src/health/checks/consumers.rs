use super::routes::RouteHealthCheck;
use super::RouteCheckCache;
use crate::health::{
    CheckBase, HealthCheck, HealthCheckRepository, HealthCheckResultBuilder, Options,
};
use crate::runtime::{Route, RuntimeContext};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub const CONSUMERS_REPOSITORY_ID: &str = "consumers";

/// Reports the route status plus the poll health of its consumer
pub struct ConsumerHealthCheck {
    route_check: RouteHealthCheck,
}

impl ConsumerHealthCheck {
    pub fn new(route: Arc<Route>, context: &Arc<RuntimeContext>) -> Self {
        Self {
            route_check: RouteHealthCheck::with_prefix("consumer", route, context),
        }
    }
}

#[async_trait]
impl HealthCheck for ConsumerHealthCheck {
    fn base(&self) -> &CheckBase {
        self.route_check.base()
    }

    async fn do_call(&self, builder: &mut HealthCheckResultBuilder, _options: &Options) {
        if !self.route_check.check_route(builder) {
            return;
        }

        let route = self.route_check.route();
        let Some(consumer) = route.consumer() else {
            return;
        };

        let errors = consumer.consecutive_errors();
        builder
            .detail("consumer.uri", consumer.endpoint_uri())
            .detail("poll.count", consumer.poll_count())
            .detail("failure.error.count", errors)
            .detail("failure.threshold", consumer.failure_threshold());

        if errors >= consumer.failure_threshold() {
            builder.down().message(format!(
                "Consumer {} failed polling {} time(s)",
                consumer.endpoint_uri(),
                errors
            ));
            if let Some(error) = consumer.last_error() {
                builder.error(error);
            }
        } else {
            builder.up();
        }
    }
}

/// One `ConsumerHealthCheck` per route whose consumer reports health
pub struct ConsumersHealthCheckRepository {
    context: Weak<RuntimeContext>,
    enabled: AtomicBool,
    cache: RouteCheckCache,
}

impl ConsumersHealthCheckRepository {
    pub fn new(context: &Arc<RuntimeContext>) -> Self {
        Self {
            context: Arc::downgrade(context),
            enabled: AtomicBool::new(true),
            cache: RouteCheckCache::default(),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl HealthCheckRepository for ConsumersHealthCheckRepository {
    fn id(&self) -> &str {
        CONSUMERS_REPOSITORY_ID
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn checks(&self) -> Vec<Arc<dyn HealthCheck>> {
        let Some(context) = self.context.upgrade() else {
            return Vec::new();
        };

        let routes: Vec<_> = context
            .routes()
            .into_iter()
            .filter(|route| route.consumer().is_some_and(|c| c.is_health_enabled()))
            .collect();

        self.cache.refresh(&routes, |route| {
            Arc::new(ConsumerHealthCheck::new(route.clone(), &context))
        })
    }
}

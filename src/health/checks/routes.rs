use super::{matches_pattern, RouteCheckCache, ROUTE_CHECK_GROUP};
use crate::health::{
    CheckBase, HealthCheck, HealthCheckRepository, HealthCheckResultBuilder, Options,
};
use crate::runtime::{Route, RuntimeContext};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub const ROUTES_REPOSITORY_ID: &str = "routes";

/// Reports the status of a single route
pub struct RouteHealthCheck {
    base: CheckBase,
    route: Arc<Route>,
}

impl RouteHealthCheck {
    pub fn new(route: Arc<Route>, context: &Arc<RuntimeContext>) -> Self {
        Self::with_prefix("route", route, context)
    }

    pub(super) fn with_prefix(
        prefix: &str,
        route: Arc<Route>,
        context: &Arc<RuntimeContext>,
    ) -> Self {
        let base = CheckBase::new(
            Some(ROUTE_CHECK_GROUP),
            format!("{}:{}", prefix, route.id()),
        );
        base.bind_context(context);
        Self { base, route }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Route part of the check, shared with consumer checks
    ///
    /// Returns whether the route counts as up.
    pub(super) fn check_route(&self, builder: &mut HealthCheckResultBuilder) -> bool {
        let status = self.route.status();
        builder
            .detail("route.id", self.route.id())
            .detail("route.status", status.as_str())
            .detail("route.auto.startup", self.route.is_auto_startup());
        if let Some(context) = self.base.context() {
            builder.detail("route.context", context.name());
        }

        if status.is_started() {
            builder.up();
            true
        } else if !self.route.is_auto_startup() {
            // Routes that are not auto-started are expected to be stopped
            builder
                .up()
                .message(format!("Route {} is not auto-started", self.route.id()));
            true
        } else {
            builder
                .down()
                .message(format!("Route {} has status {}", self.route.id(), status));
            false
        }
    }
}

#[async_trait]
impl HealthCheck for RouteHealthCheck {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    async fn do_call(&self, builder: &mut HealthCheckResultBuilder, _options: &Options) {
        self.check_route(builder);
    }
}

/// One `RouteHealthCheck` per route of the context
pub struct RoutesHealthCheckRepository {
    context: Weak<RuntimeContext>,
    exclusions: Vec<String>,
    enabled: AtomicBool,
    cache: RouteCheckCache,
}

impl RoutesHealthCheckRepository {
    pub fn new(context: &Arc<RuntimeContext>) -> Self {
        Self {
            context: Arc::downgrade(context),
            exclusions: Vec::new(),
            enabled: AtomicBool::new(true),
            cache: RouteCheckCache::default(),
        }
    }

    /// Skip routes whose id matches any of the patterns (`*` wildcard)
    pub fn with_exclusions<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_excluded(&self, route_id: &str) -> bool {
        self.exclusions
            .iter()
            .any(|pattern| matches_pattern(pattern, route_id))
    }
}

impl HealthCheckRepository for RoutesHealthCheckRepository {
    fn id(&self) -> &str {
        ROUTES_REPOSITORY_ID
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
            .filter(|route| !self.is_excluded(route.id()))
            .collect();

        self.cache.refresh(&routes, |route| {
            Arc::new(RouteHealthCheck::new(route.clone(), &context))
        })
    }
}

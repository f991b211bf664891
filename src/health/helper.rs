//! Direct invocation of checks by probe kind
//!
//! Used by reporting surfaces that want fresh results rather than the
//! service's cache.

use super::{HealthCheck, HealthCheckRegistry, HealthCheckResult, Options, State};

/// Which probe a caller is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Readiness,
    Liveness,
    All,
}

impl Kind {
    pub fn accepts(&self, check: &dyn HealthCheck) -> bool {
        match self {
            Kind::Readiness => check.is_readiness(),
            Kind::Liveness => check.is_liveness(),
            Kind::All => true,
        }
    }
}

/// Invoke every enabled check of `kind`, lowest order first
pub async fn invoke(
    registry: &HealthCheckRegistry,
    kind: Kind,
    options: &Options,
) -> Vec<HealthCheckResult> {
    let mut checks: Vec<_> = registry
        .stream()
        .into_iter()
        .filter(|check| check.is_enabled() && kind.accepts(check.as_ref()))
        .collect();
    checks.sort_by_key(|check| check.order());

    let mut results = Vec::with_capacity(checks.len());
    for check in checks {
        results.push(check.call(options).await);
    }
    results
}

/// Overall state of a set of results
///
/// DOWN if any result is DOWN, otherwise UNKNOWN if any is UNKNOWN,
/// otherwise UP (including the empty set).
pub fn aggregate(results: &[HealthCheckResult]) -> State {
    if results.iter().any(|r| r.state() == State::Down) {
        State::Down
    } else if results.iter().any(|r| r.state() == State::Unknown) {
        State::Unknown
    } else {
        State::Up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::checks::{ContextHealthCheck, RouteControllerHealthCheck};
    use crate::health::{CheckBase, HealthCheckResultBuilder, Registrable};
    use crate::runtime::{RuntimeContext, SupervisingRouteController};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct PanickingCheck {
        base: CheckBase,
    }

    #[async_trait]
    impl HealthCheck for PanickingCheck {
        fn base(&self) -> &CheckBase {
            &self.base
        }

        async fn do_call(&self, _builder: &mut HealthCheckResultBuilder, _options: &Options) {
            panic!("connection pool poisoned");
        }
    }

    fn registry() -> (Arc<RuntimeContext>, HealthCheckRegistry) {
        let ctx = Arc::new(RuntimeContext::new("helper"));
        ctx.start();
        let registry = HealthCheckRegistry::new(ctx.clone());
        registry.register(Registrable::Check(Arc::new(ContextHealthCheck::new(&ctx))));
        registry.register(Registrable::Check(Arc::new(RouteControllerHealthCheck::new(&ctx))));
        (ctx, registry)
    }

    #[tokio::test]
    async fn test_invoke_filters_by_kind() {
        let (_ctx, registry) = registry();

        let liveness = invoke(&registry, Kind::Liveness, &Options::new()).await;
        let readiness = invoke(&registry, Kind::Readiness, &Options::new()).await;
        let all = invoke(&registry, Kind::All, &Options::new()).await;

        let ids = |results: &[HealthCheckResult]| -> Vec<String> {
            results.iter().map(|r| r.check().id().to_string()).collect()
        };
        assert_eq!(ids(&liveness), vec!["context"]);
        assert_eq!(ids(&readiness), vec!["context", "route-controller"]);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_invoke_skips_disabled_checks() {
        let (_ctx, registry) = registry();
        registry
            .get_check("context")
            .expect("context check")
            .base()
            .set_enabled(false);

        let results = invoke(&registry, Kind::All, &Options::new()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].check().id(), "route-controller");
    }

    #[tokio::test]
    async fn test_aggregate() {
        let (ctx, registry) = registry();
        let results = invoke(&registry, Kind::Readiness, &Options::new()).await;
        assert_eq!(aggregate(&results), State::Up);

        let controller = Arc::new(SupervisingRouteController::new());
        controller.set_starting_routes(true);
        ctx.set_route_controller(Some(controller));
        let results = invoke(&registry, Kind::Readiness, &Options::new()).await;
        assert_eq!(aggregate(&results), State::Down);

        assert_eq!(aggregate(&[]), State::Up);
    }

    #[tokio::test]
    async fn test_invoke_reports_panicking_check_as_down() {
        let (_ctx, registry) = registry();
        registry.register(Registrable::Check(Arc::new(PanickingCheck {
            base: CheckBase::new(None, "pool"),
        })));

        let results = invoke(&registry, Kind::All, &Options::new()).await;

        assert_eq!(results.len(), 3);
        let pool = results
            .iter()
            .find(|r| r.check().id() == "pool")
            .expect("pool result");
        assert_eq!(pool.state(), State::Down);
        assert!(pool
            .error()
            .is_some_and(|e| e.contains("connection pool poisoned")));
        assert_eq!(aggregate(&results), State::Down);
    }
}

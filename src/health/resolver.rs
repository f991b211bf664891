//! Discovery of checks and repositories by id
//!
//! An explicit factory table takes the place of scanning packaged
//! resources. Lookups try `<id>-health-check` (or
//! `<id>-health-check-repository`) first, then the bare id.

use super::checks::{
    ConsumersHealthCheckRepository, ContextHealthCheck, RouteControllerHealthCheck,
    RoutesHealthCheckRepository,
};
use super::{HealthCheck, HealthCheckRepository};
use crate::error::HealthError;
use crate::runtime::RuntimeContext;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CHECK_SUFFIX: &str = "-health-check";
pub const REPOSITORY_SUFFIX: &str = "-health-check-repository";

pub type CheckFactory = Arc<dyn Fn(&Arc<RuntimeContext>) -> Arc<dyn HealthCheck> + Send + Sync>;
pub type RepositoryFactory =
    Arc<dyn Fn(&Arc<RuntimeContext>) -> Arc<dyn HealthCheckRepository> + Send + Sync>;

/// Factory table for checks and repositories
#[derive(Clone, Default)]
pub struct HealthCheckResolver {
    checks: BTreeMap<String, CheckFactory>,
    repositories: BTreeMap<String, RepositoryFactory>,
}

impl HealthCheckResolver {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in checks and repositories
    pub fn with_defaults() -> Self {
        let mut checks: BTreeMap<String, CheckFactory> = BTreeMap::new();
        checks.insert(
            "context-health-check".to_string(),
            Arc::new(|ctx: &Arc<RuntimeContext>| -> Arc<dyn HealthCheck> {
                Arc::new(ContextHealthCheck::new(ctx))
            }),
        );
        checks.insert(
            "route-controller-health-check".to_string(),
            Arc::new(|ctx: &Arc<RuntimeContext>| -> Arc<dyn HealthCheck> {
                Arc::new(RouteControllerHealthCheck::new(ctx))
            }),
        );

        let mut repositories: BTreeMap<String, RepositoryFactory> = BTreeMap::new();
        repositories.insert(
            "routes-health-check-repository".to_string(),
            Arc::new(|ctx: &Arc<RuntimeContext>| -> Arc<dyn HealthCheckRepository> {
                Arc::new(RoutesHealthCheckRepository::new(ctx))
            }),
        );
        repositories.insert(
            "consumers-health-check-repository".to_string(),
            Arc::new(|ctx: &Arc<RuntimeContext>| -> Arc<dyn HealthCheckRepository> {
                Arc::new(ConsumersHealthCheckRepository::new(ctx))
            }),
        );

        Self {
            checks,
            repositories,
        }
    }

    /// Add a check factory under `name`
    ///
    /// # Errors
    /// `HealthError::DuplicateFactory` if the name is taken.
    pub fn add_check_factory<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), HealthError>
    where
        F: Fn(&Arc<RuntimeContext>) -> Arc<dyn HealthCheck> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.checks.contains_key(&name) {
            return Err(HealthError::DuplicateFactory(name));
        }
        self.checks.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Add a repository factory under `name`
    ///
    /// # Errors
    /// `HealthError::DuplicateFactory` if the name is taken.
    pub fn add_repository_factory<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), HealthError>
    where
        F: Fn(&Arc<RuntimeContext>) -> Arc<dyn HealthCheckRepository> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.repositories.contains_key(&name) {
            return Err(HealthError::DuplicateFactory(name));
        }
        self.repositories.insert(name, Arc::new(factory));
        Ok(())
    }

    pub fn resolve_check(
        &self,
        ctx: &Arc<RuntimeContext>,
        id: &str,
    ) -> Option<Arc<dyn HealthCheck>> {
        self.checks
            .get(&format!("{}{}", id, CHECK_SUFFIX))
            .or_else(|| self.checks.get(id))
            .map(|factory| factory(ctx))
    }

    pub fn resolve_repository(
        &self,
        ctx: &Arc<RuntimeContext>,
        id: &str,
    ) -> Option<Arc<dyn HealthCheckRepository>> {
        self.repositories
            .get(&format!("{}{}", id, REPOSITORY_SUFFIX))
            .or_else(|| self.repositories.get(id))
            .map(|factory| factory(ctx))
    }

    /// Names of all check factories, sorted
    pub fn check_names(&self) -> Vec<&str> {
        self.checks.keys().map(String::as_str).collect()
    }

    /// Names of all repository factories, sorted
    pub fn repository_names(&self) -> Vec<&str> {
        self.repositories.keys().map(String::as_str).collect()
    }

    pub(crate) fn check_factories(&self) -> impl Iterator<Item = &CheckFactory> {
        self.checks.values()
    }

    pub(crate) fn repository_factories(&self) -> impl Iterator<Item = &RepositoryFactory> {
        self.repositories.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::checks::{CONTEXT_CHECK_ID, ROUTES_REPOSITORY_ID};

    #[test]
    fn test_resolve_check_tries_suffix_then_bare_id() {
        let ctx = Arc::new(RuntimeContext::new("resolver"));
        let mut resolver = HealthCheckResolver::with_defaults();
        resolver
            .add_check_factory("bare", |ctx: &Arc<RuntimeContext>| -> Arc<dyn HealthCheck> {
                Arc::new(RouteControllerHealthCheck::new(ctx))
            })
            .expect("add factory");

        let by_suffix = resolver.resolve_check(&ctx, "context").expect("context check");
        assert_eq!(by_suffix.id(), CONTEXT_CHECK_ID);

        let by_bare_name = resolver.resolve_check(&ctx, "bare").expect("bare check");
        assert_eq!(by_bare_name.id(), "route-controller");

        assert!(resolver.resolve_check(&ctx, "missing").is_none());
    }

    #[test]
    fn test_resolve_repository() {
        let ctx = Arc::new(RuntimeContext::new("resolver"));
        let resolver = HealthCheckResolver::with_defaults();

        let repo = resolver
            .resolve_repository(&ctx, "routes")
            .expect("routes repository");
        assert_eq!(repo.id(), ROUTES_REPOSITORY_ID);
        assert!(resolver.resolve_repository(&ctx, "context").is_none());
    }

    #[test]
    fn test_duplicate_factory_rejected() {
        let mut resolver = HealthCheckResolver::with_defaults();

        let err = resolver
            .add_check_factory("context-health-check", |ctx: &Arc<RuntimeContext>| -> Arc<dyn HealthCheck> {
                Arc::new(ContextHealthCheck::new(ctx))
            })
            .expect_err("duplicate");

        assert!(matches!(err, HealthError::DuplicateFactory(name) if name == "context-health-check"));
    }

    #[test]
    fn test_default_names() {
        let resolver = HealthCheckResolver::with_defaults();
        assert_eq!(
            resolver.check_names(),
            vec!["context-health-check", "route-controller-health-check"]
        );
        assert_eq!(
            resolver.repository_names(),
            vec!["consumers-health-check-repository", "routes-health-check-repository"]
        );
        assert!(HealthCheckResolver::new().check_names().is_empty());
    }
}

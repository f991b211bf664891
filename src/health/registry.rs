//! Registry aggregating health checks and repositories

use super::checks::ContextRegistryRepository;
use super::{HealthCheck, HealthCheckRepository, HealthCheckResolver};
use crate::error::HealthError;
use crate::runtime::RuntimeContext;
use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Something the registry accepts
#[derive(Clone)]
pub enum Registrable {
    Check(Arc<dyn HealthCheck>),
    Repository(Arc<dyn HealthCheckRepository>),
}

impl Registrable {
    pub fn id(&self) -> &str {
        match self {
            Registrable::Check(check) => check.id(),
            Registrable::Repository(repository) => repository.id(),
        }
    }
}

impl From<Arc<dyn HealthCheck>> for Registrable {
    fn from(check: Arc<dyn HealthCheck>) -> Self {
        Registrable::Check(check)
    }
}

impl From<Arc<dyn HealthCheckRepository>> for Registrable {
    fn from(repository: Arc<dyn HealthCheckRepository>) -> Self {
        Registrable::Repository(repository)
    }
}

/// Aggregation point for all checks and repositories of a runtime
///
/// Checks and repositories are unique by id. The built-in repository for
/// checks bound in the context's bean registry is installed on construction.
pub struct HealthCheckRegistry {
    context: Arc<RuntimeContext>,
    resolver: HealthCheckResolver,
    enabled: AtomicBool,
    checks: RwLock<Vec<Arc<dyn HealthCheck>>>,
    repositories: RwLock<Vec<Arc<dyn HealthCheckRepository>>>,
}

impl HealthCheckRegistry {
    pub fn new(context: Arc<RuntimeContext>) -> Self {
        Self::with_resolver(context, HealthCheckResolver::with_defaults())
    }

    pub fn with_resolver(context: Arc<RuntimeContext>, resolver: HealthCheckResolver) -> Self {
        let registry = Self {
            resolver,
            enabled: AtomicBool::new(true),
            checks: RwLock::new(Vec::new()),
            repositories: RwLock::new(Vec::new()),
            context,
        };
        let builtin: Arc<dyn HealthCheckRepository> =
            Arc::new(ContextRegistryRepository::new(&registry.context));
        registry.register(builtin);
        registry
    }

    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.context
    }

    pub fn resolver(&self) -> &HealthCheckResolver {
        &self.resolver
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// A disabled registry streams no checks
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Register a check or repository
    ///
    /// Returns `false` when an entry with the same id is already registered.
    pub fn register(&self, item: impl Into<Registrable>) -> bool {
        match item.into() {
            Registrable::Check(check) => {
                let mut checks = self.checks.write().unwrap_or_else(PoisonError::into_inner);
                if checks.iter().any(|c| c.id() == check.id()) {
                    debug!(check = %check.id(), "Health check already registered");
                    return false;
                }
                check.base().bind_context(&self.context);
                info!(check = %check.id(), "Registered health check");
                checks.push(check);
                true
            }
            Registrable::Repository(repository) => {
                let mut repositories = self
                    .repositories
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if repositories.iter().any(|r| r.id() == repository.id()) {
                    debug!(
                        repository = %repository.id(),
                        "Health check repository already registered"
                    );
                    return false;
                }
                info!(repository = %repository.id(), "Registered health check repository");
                repositories.push(repository);
                true
            }
        }
    }

    /// Remove a check or repository by id
    ///
    /// Returns whether something was removed.
    pub fn unregister(&self, item: impl Into<Registrable>) -> bool {
        let item = item.into();
        let id = item.id();
        let removed = match &item {
            Registrable::Check(_) => {
                let mut checks = self.checks.write().unwrap_or_else(PoisonError::into_inner);
                let before = checks.len();
                checks.retain(|c| c.id() != id);
                checks.len() != before
            }
            Registrable::Repository(_) => {
                let mut repositories = self
                    .repositories
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                let before = repositories.len();
                repositories.retain(|r| r.id() != id);
                repositories.len() != before
            }
        };

        if removed {
            info!(id = %id, "Unregistered health check entry");
        }
        removed
    }

    /// Register a runtime-typed object
    ///
    /// Accepts `Arc<dyn HealthCheck>`, `Arc<dyn HealthCheckRepository>` or a
    /// `Registrable`.
    ///
    /// # Errors
    /// `HealthError::NotAccepted` for anything else.
    pub fn register_any(&self, item: &dyn Any) -> Result<bool, HealthError> {
        Ok(self.register(Self::accept(item)?))
    }

    /// Counterpart of `register_any`
    ///
    /// # Errors
    /// `HealthError::NotAccepted` for objects `register_any` would reject.
    pub fn unregister_any(&self, item: &dyn Any) -> Result<bool, HealthError> {
        Ok(self.unregister(Self::accept(item)?))
    }

    fn accept(item: &dyn Any) -> Result<Registrable, HealthError> {
        if let Some(check) = item.downcast_ref::<Arc<dyn HealthCheck>>() {
            Ok(Registrable::Check(check.clone()))
        } else if let Some(repository) = item.downcast_ref::<Arc<dyn HealthCheckRepository>>() {
            Ok(Registrable::Repository(repository.clone()))
        } else if let Some(registrable) = item.downcast_ref::<Registrable>() {
            Ok(registrable.clone())
        } else {
            Err(HealthError::NotAccepted)
        }
    }

    /// Find a check by id: registered checks, then the bean registry, then discovery
    ///
    /// Discovered checks are not registered.
    pub fn resolve_by_id(&self, id: &str) -> Option<Arc<dyn HealthCheck>> {
        let registered = self
            .checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.id() == id)
            .cloned();

        registered
            .or_else(|| self.context.health_check_bean(id))
            .or_else(|| {
                let check = self.resolver.resolve_check(&self.context, id)?;
                debug!(check = %id, "Resolved health check through discovery");
                Some(check)
            })
    }

    /// Find a repository by id: registered repositories, then discovery
    pub fn resolve_repository_by_id(&self, id: &str) -> Option<Arc<dyn HealthCheckRepository>> {
        self.repository(id)
            .or_else(|| self.resolver.resolve_repository(&self.context, id))
    }

    pub fn repository(&self, id: &str) -> Option<Arc<dyn HealthCheckRepository>> {
        self.repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    /// Look up a check among those `stream()` yields
    pub fn get_check(&self, id: &str) -> Option<Arc<dyn HealthCheck>> {
        self.stream().into_iter().find(|c| c.id() == id)
    }

    /// Ids of all checks `stream()` yields
    pub fn check_ids(&self) -> Vec<String> {
        self.stream().iter().map(|c| c.id().to_string()).collect()
    }

    /// Registered checks followed by the checks of enabled repositories
    ///
    /// De-duplicated by id, first occurrence wins. Empty when disabled.
    pub fn stream(&self) -> Vec<Arc<dyn HealthCheck>> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut result = Vec::new();

        let checks = self
            .checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let repositories = self
            .repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let from_repositories = repositories
            .iter()
            .filter(|r| r.is_enabled())
            .flat_map(|r| r.checks());

        for check in checks.into_iter().chain(from_repositories) {
            if seen.insert(check.id().to_string()) {
                result.push(check);
            }
        }
        result
    }

    /// Register everything the discovery table knows
    ///
    /// Returns how many new entries were registered.
    pub fn load_health_checks(&self) -> usize {
        let checks = self
            .resolver
            .check_factories()
            .map(|factory| Registrable::Check(factory(&self.context)));
        let repositories = self
            .resolver
            .repository_factories()
            .map(|factory| Registrable::Repository(factory(&self.context)));

        let loaded = checks
            .chain(repositories)
            .filter(|item| self.register(item.clone()))
            .count();
        info!(loaded, "Loaded health checks from discovery table");
        loaded
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

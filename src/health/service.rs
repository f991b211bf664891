//! Background polling of health checks
//!
//! The service invokes every check of the registry on a fixed interval,
//! keeps the last result per check and notifies listeners when a check's
//! state changes. Scheduled and on-demand invocations share one write
//! lock, so invocations, cache updates and notifications never interleave.

use super::check::mark_failed;
use super::{
    HealthCheck, HealthCheckRegistry, HealthCheckResult, HealthCheckResultBuilder, Options, State,
    DETAIL_CHECK_GROUP, DETAIL_CHECK_ID,
};
use crate::server::SharedMetrics;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default time between two scheduled ticks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default upper bound for a single check invocation
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Time between two scheduled ticks
    pub check_interval: Duration,
    /// A check still running after this long is reported DOWN
    pub check_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }
}

/// Receives state transitions observed by the service
///
/// Called synchronously while the service lock is held: a slow listener
/// delays every other invocation. Must not call back into the service.
pub trait StateChangeListener: Send + Sync {
    fn on_state_change(&self, state: State, check: &dyn HealthCheck);
}

impl<F> StateChangeListener for F
where
    F: Fn(State, &dyn HealthCheck) + Send + Sync,
{
    fn on_state_change(&self, state: State, check: &dyn HealthCheck) {
        self(state, check)
    }
}

struct CachedResult {
    check: Arc<dyn HealthCheck>,
    result: HealthCheckResult,
}

#[derive(Default)]
struct ServiceState {
    results: HashMap<String, CachedResult>,
    listeners: Vec<Arc<dyn StateChangeListener>>,
    options: HashMap<String, Options>,
}

/// Scheduled health check poller
pub struct HealthCheckService {
    registry: Option<Arc<HealthCheckRegistry>>,
    config: ServiceConfig,
    metrics: Option<SharedMetrics>,
    running: AtomicBool,
    state: RwLock<ServiceState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthCheckService {
    pub fn new(registry: Option<Arc<HealthCheckRegistry>>, config: ServiceConfig) -> Self {
        Self {
            registry,
            config,
            metrics: None,
            running: AtomicBool::new(false),
            state: RwLock::new(ServiceState::default()),
            task: Mutex::new(None),
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> Option<&Arc<HealthCheckRegistry>> {
        self.registry.as_ref()
    }

    pub fn check_interval(&self) -> Duration {
        self.config.check_interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start polling
    ///
    /// The polling task is only spawned when a registry is present; the
    /// first tick fires immediately. Must be called within a Tokio runtime.
    pub fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);

        if self.registry.is_none() {
            info!("No health check registry, scheduled checks disabled");
            return;
        }

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }

        let service = Arc::downgrade(self);
        let period = self.config.check_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                service.run_scheduled_checks().await;
            }
        }));

        info!(interval_ms = period.as_millis() as u64, "Health check service started");
    }

    /// Stop polling
    ///
    /// Aborts the polling task; an in-flight tick is dropped at its next
    /// await point. A later `start()` spawns a fresh task.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            info!("Health check service stopped");
        }
    }

    /// Run one scheduled tick
    ///
    /// Checks run sequentially, grouped by group and ordered by `order()`.
    async fn run_scheduled_checks(&self) {
        if !self.is_running() {
            debug!("Health check service not running, skipping tick");
            return;
        }
        let Some(registry) = &self.registry else {
            return;
        };

        for check in order_checks(registry.stream()) {
            let options = self
                .state
                .read()
                .await
                .options
                .get(check.id())
                .cloned()
                .unwrap_or_default();
            self.invoke(&check, &options).await;
        }
    }

    /// Invoke a check by id with no options
    ///
    /// `None` if the registry does not know the id.
    pub async fn call(&self, id: &str) -> Option<HealthCheckResult> {
        self.call_with_options(id, &Options::new()).await
    }

    /// Invoke a check by id, bypassing the schedule
    pub async fn call_with_options(
        &self,
        id: &str,
        options: &Options,
    ) -> Option<HealthCheckResult> {
        let check = self.registry.as_ref()?.get_check(id)?;
        Some(self.invoke(&check, options).await)
    }

    /// Invoke a check, cache its result and notify listeners on a state change
    ///
    /// Holds the service write lock for the whole sequence.
    pub async fn invoke(
        &self,
        check: &Arc<dyn HealthCheck>,
        options: &Options,
    ) -> HealthCheckResult {
        let mut state = self.state.write().await;

        let started = Instant::now();
        let result = self.guarded_call(check, options).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_invocation(
                check.id(),
                check.group(),
                result.state(),
                started.elapsed().as_secs_f64(),
            );
        }

        let previous = state
            .results
            .insert(
                check.id().to_string(),
                CachedResult {
                    check: check.clone(),
                    result: result.clone(),
                },
            )
            .map(|cached| cached.result.state());

        if previous != Some(result.state()) {
            info!(
                check = %check.id(),
                from = ?previous,
                to = %result.state(),
                "Health check state changed"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_transition(check.id());
            }
            for listener in &state.listeners {
                let notified = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    listener.on_state_change(result.state(), check.as_ref())
                }));
                if notified.is_err() {
                    warn!(check = %check.id(), "State change listener panicked");
                }
            }
        }

        result
    }

    /// Call the check with a timeout, converting a hang into a DOWN result
    ///
    /// Panics are already reported by the check itself.
    async fn guarded_call(
        &self,
        check: &Arc<dyn HealthCheck>,
        options: &Options,
    ) -> HealthCheckResult {
        match tokio::time::timeout(self.config.check_timeout, check.call(options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    check = %check.id(),
                    timeout_ms = self.config.check_timeout.as_millis() as u64,
                    "Health check timed out"
                );
                timeout_result(check.as_ref(), self.config.check_timeout)
            }
        }
    }

    /// Options passed to a check on scheduled ticks
    pub async fn set_check_options(&self, id: &str, options: Options) {
        self.state
            .write()
            .await
            .options
            .insert(id.to_string(), options);
    }

    /// Last cached result of a check
    pub async fn result(&self, id: &str) -> Option<HealthCheckResult> {
        self.state
            .read()
            .await
            .results
            .get(id)
            .map(|cached| cached.result.clone())
    }

    /// All cached results, ordered like a scheduled tick
    pub async fn results(&self) -> Vec<HealthCheckResult> {
        let state = self.state.read().await;
        let checks = state.results.values().map(|c| c.check.clone()).collect();
        order_checks(checks)
            .iter()
            .filter_map(|check| state.results.get(check.id()))
            .map(|cached| cached.result.clone())
            .collect()
    }

    pub async fn add_state_change_listener(&self, listener: Arc<dyn StateChangeListener>) {
        self.state.write().await.listeners.push(listener);
    }

    /// Remove a listener previously added (compared by pointer)
    pub async fn remove_state_change_listener(
        &self,
        listener: &Arc<dyn StateChangeListener>,
    ) -> bool {
        let mut state = self.state.write().await;
        let before = state.listeners.len();
        state.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        state.listeners.len() != before
    }
}

impl Drop for HealthCheckService {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

/// Group checks by group, then stable-sort by order
fn order_checks(checks: Vec<Arc<dyn HealthCheck>>) -> Vec<Arc<dyn HealthCheck>> {
    let mut groups: BTreeMap<Option<String>, Vec<Arc<dyn HealthCheck>>> = BTreeMap::new();
    for check in checks {
        groups
            .entry(check.group().map(str::to_string))
            .or_default()
            .push(check);
    }

    let mut ordered: Vec<_> = groups.into_values().flatten().collect();
    ordered.sort_by_key(|check| check.order());
    ordered
}

/// DOWN result for a check that did not finish in time
///
/// Counted on the check like any other DOWN.
fn timeout_result(check: &dyn HealthCheck, timeout: Duration) -> HealthCheckResult {
    let base = check.base();
    let mut builder = HealthCheckResultBuilder::on(base.identity().clone());
    builder.detail(DETAIL_CHECK_ID, base.id());
    if let Some(group) = base.group() {
        builder.detail(DETAIL_CHECK_GROUP, group);
    }
    mark_failed(
        &mut builder,
        "timeout",
        format!("Health check timed out after {:?}", timeout),
    );
    base.record_failure(&mut builder);
    builder.build()
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;

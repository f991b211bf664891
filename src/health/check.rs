//! The `HealthCheck` capability and its invocation bookkeeping
//!
//! Implementors provide `base()` and `do_call()`; the provided `call()`
//! handles enablement, per-check serialization, counters and the
//! context's result strategy.

use super::result::{CheckIdentity, HealthCheckResult, HealthCheckResultBuilder, State};
use crate::runtime::RuntimeContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Invocation options passed through to `do_call`
pub type Options = HashMap<String, String>;

/// Option key that bypasses the check's interval and always invokes it
pub const OPTION_INVOCATION_FORCE: &str = "invocation.force";

/// Order assigned to checks that do not declare one
pub const DEFAULT_ORDER: i32 = 1000;

/// Message of the result returned by a disabled check
pub const DISABLED_MESSAGE: &str = "Disabled";

pub const DETAIL_CHECK_ID: &str = "check.id";
pub const DETAIL_CHECK_GROUP: &str = "check.group";
pub const DETAIL_CHECK_ENABLED: &str = "check.enabled";
pub const DETAIL_INVOCATION_COUNT: &str = "invocation.count";
pub const DETAIL_INVOCATION_TIME: &str = "invocation.time";
pub const DETAIL_FAILURE_COUNT: &str = "failure.count";
pub const DETAIL_FAILURE_TIME: &str = "failure.time";
pub const DETAIL_SUCCESS_COUNT: &str = "success.count";
pub const DETAIL_SUCCESS_TIME: &str = "success.time";
/// Set on results synthesized for a check that panicked or timed out
pub const DETAIL_FAILURE_KIND: &str = "failure.kind";

/// Invocation counters of a single check
///
/// Only written by the owning check while it holds its invocation lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckMeta {
    pub invocation_count: u64,
    pub failure_count: u64,
    pub success_count: u64,
    pub invocation_time: Option<DateTime<Utc>>,
    pub failure_time: Option<DateTime<Utc>>,
    pub success_time: Option<DateTime<Utc>>,
}

impl CheckMeta {
    fn record(&mut self, state: State, now: DateTime<Utc>) {
        self.invocation_count += 1;
        self.invocation_time = Some(now);

        match state {
            State::Down => {
                self.failure_count += 1;
                self.failure_time = Some(now);
                self.success_count = 0;
            }
            State::Up => {
                self.success_count += 1;
                self.success_time = Some(now);
                self.failure_count = 0;
            }
            State::Unknown => {}
        }
    }

    fn write_details(&self, builder: &mut HealthCheckResultBuilder) {
        builder
            .detail(DETAIL_INVOCATION_COUNT, self.invocation_count)
            .detail(DETAIL_FAILURE_COUNT, self.failure_count)
            .detail(DETAIL_SUCCESS_COUNT, self.success_count);

        if let Some(time) = self.invocation_time {
            builder.detail(DETAIL_INVOCATION_TIME, time.to_rfc3339());
        }
        if let Some(time) = self.failure_time {
            builder.detail(DETAIL_FAILURE_TIME, time.to_rfc3339());
        }
        if let Some(time) = self.success_time {
            builder.detail(DETAIL_SUCCESS_TIME, time.to_rfc3339());
        }
    }
}

#[derive(Debug, Default)]
struct Bookkeeping {
    meta: CheckMeta,
    last: Option<(Instant, HealthCheckResult)>,
}

/// Post-processes a result after the check's own logic ran
///
/// Installed on the runtime context, e.g. to downgrade the severity of
/// selected checks. Runs under the per-check lock.
pub trait HealthCheckResultStrategy: Send + Sync {
    fn process(&self, check: &CheckBase, options: &Options, builder: &mut HealthCheckResultBuilder);
}

/// State shared by every check implementation
pub struct CheckBase {
    identity: CheckIdentity,
    order: i32,
    readiness: bool,
    liveness: bool,
    interval: Option<Duration>,
    enabled: AtomicBool,
    context: OnceLock<Weak<RuntimeContext>>,
    lock: tokio::sync::Mutex<()>,
    bookkeeping: Mutex<Bookkeeping>,
}

impl CheckBase {
    pub fn new(group: Option<&str>, id: impl Into<String>) -> Self {
        Self {
            identity: CheckIdentity::new(group, id),
            order: DEFAULT_ORDER,
            readiness: true,
            liveness: true,
            interval: None,
            enabled: AtomicBool::new(true),
            context: OnceLock::new(),
            lock: tokio::sync::Mutex::new(()),
            bookkeeping: Mutex::new(Bookkeeping::default()),
        }
    }

    /// Lower orders run first during a scheduled tick
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_readiness(mut self, readiness: bool) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_liveness(mut self, liveness: bool) -> Self {
        self.liveness = liveness;
        self
    }

    /// Minimum time between two real invocations
    ///
    /// Calls arriving sooner get the previous result unless forced
    /// with `OPTION_INVOCATION_FORCE`.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn identity(&self) -> &CheckIdentity {
        &self.identity
    }

    pub fn id(&self) -> &str {
        self.identity.id()
    }

    pub fn group(&self) -> Option<&str> {
        self.identity.group()
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn is_readiness(&self) -> bool {
        self.readiness
    }

    pub fn is_liveness(&self) -> bool {
        self.liveness
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Attach the runtime context; the first binding wins
    pub fn bind_context(&self, context: &Arc<RuntimeContext>) {
        let _ = self.context.set(Arc::downgrade(context));
    }

    /// The bound runtime context, if it is still alive
    pub fn context(&self) -> Option<Arc<RuntimeContext>> {
        self.context.get().and_then(Weak::upgrade)
    }

    /// Snapshot of the invocation counters
    pub fn meta(&self) -> CheckMeta {
        self.bookkeeping
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .meta
            .clone()
    }

    fn record(&self, state: State, builder: &mut HealthCheckResultBuilder) {
        let mut bookkeeping = self
            .bookkeeping
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        bookkeeping.meta.record(state, Utc::now());
        bookkeeping.meta.write_details(builder);
    }

    /// Count a DOWN produced outside `do_call` and write the counters
    pub(crate) fn record_failure(&self, builder: &mut HealthCheckResultBuilder) {
        self.record(State::Down, builder);
    }

    fn cached_result(&self, options: &Options) -> Option<HealthCheckResult> {
        let interval = self.interval?;
        if options
            .get(OPTION_INVOCATION_FORCE)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return None;
        }

        let bookkeeping = self
            .bookkeeping
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match &bookkeeping.last {
            Some((at, result)) if at.elapsed() < interval => Some(result.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for CheckBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckBase")
            .field("identity", &self.identity)
            .field("order", &self.order)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// A named probe producing a tri-state result
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Shared identity, configuration and counters
    fn base(&self) -> &CheckBase;

    /// Check-specific logic
    ///
    /// Must set a state on the builder; a missing state yields `Unknown`.
    /// Failures belong in the builder (`down()` plus `error()`). A panic is
    /// caught and reported as DOWN with `failure.kind=panic`.
    async fn do_call(&self, builder: &mut HealthCheckResultBuilder, options: &Options);

    fn id(&self) -> &str {
        self.base().id()
    }

    fn group(&self) -> Option<&str> {
        self.base().group()
    }

    fn order(&self) -> i32 {
        self.base().order()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn is_readiness(&self) -> bool {
        self.base().is_readiness()
    }

    fn is_liveness(&self) -> bool {
        self.base().is_liveness()
    }

    /// Invoke the check
    ///
    /// Concurrent callers of the same check are serialized; different checks
    /// run independently. Never fails: problems are reported in the result.
    async fn call(&self, options: &Options) -> HealthCheckResult {
        invoke_check(self, options).await
    }
}

async fn invoke_check<C>(check: &C, options: &Options) -> HealthCheckResult
where
    C: HealthCheck + ?Sized,
{
    let base = check.base();
    let mut builder = HealthCheckResultBuilder::on(base.identity().clone());
    builder.detail(DETAIL_CHECK_ID, base.id());
    if let Some(group) = base.group() {
        builder.detail(DETAIL_CHECK_GROUP, group);
    }

    if !base.is_enabled() {
        builder
            .unknown()
            .message(DISABLED_MESSAGE)
            .detail(DETAIL_CHECK_ENABLED, false);
        return builder.build();
    }

    let guard = base.lock.lock().await;

    if let Some(previous) = base.cached_result(options) {
        debug!(check = %base.id(), "Returning result cached within check interval");
        return previous;
    }

    let outcome = AssertUnwindSafe(check.do_call(&mut builder, options))
        .catch_unwind()
        .await;
    if let Err(panic) = outcome {
        let reason = panic_message(panic.as_ref());
        warn!(check = %base.id(), error = %reason, "Health check panicked");
        mark_failed(&mut builder, "panic", format!("Health check panicked: {}", reason));
    }

    let state = builder.current_state().unwrap_or(State::Unknown);
    builder.state(state);
    base.record(state, &mut builder);

    if let Some(strategy) = base.context().and_then(|ctx| ctx.result_strategy()) {
        strategy.process(base, options, &mut builder);
    }

    let result = builder.build();
    if base.interval.is_some() {
        base.bookkeeping
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last = Some((Instant::now(), result.clone()));
    }
    drop(guard);

    debug!(check = %base.id(), state = %result.state(), "Health check invoked");
    result
}

/// Turn the builder into a DOWN result describing a failure of `kind`
pub(crate) fn mark_failed(builder: &mut HealthCheckResultBuilder, kind: &str, message: String) {
    builder
        .down()
        .error(&message)
        .message(message)
        .detail(DETAIL_FAILURE_KIND, kind);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;

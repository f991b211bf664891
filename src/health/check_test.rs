//! Tests for check invocation bookkeeping

use super::*;
use crate::runtime::RuntimeContext;
use serde_json::json;
use std::sync::atomic::AtomicUsize;

/// Check whose next state is set by the test
struct ScriptedCheck {
    base: CheckBase,
    next: Mutex<Option<State>>,
    calls: AtomicUsize,
    delay: Duration,
    panics: AtomicBool,
}

impl ScriptedCheck {
    fn new(id: &str) -> Self {
        Self::with_base(CheckBase::new(Some("test"), id))
    }

    fn with_base(base: CheckBase) -> Self {
        Self {
            base,
            next: Mutex::new(Some(State::Up)),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            panics: AtomicBool::new(false),
        }
    }

    fn set_next(&self, state: Option<State>) {
        *self.next.lock().expect("lock") = state;
    }
}

#[async_trait]
impl HealthCheck for ScriptedCheck {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    async fn do_call(&self, builder: &mut HealthCheckResultBuilder, _options: &Options) {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        builder.detail("call", call as u64);
        if self.panics.load(Ordering::SeqCst) {
            panic!("scripted failure");
        }
        let next = *self.next.lock().expect("lock");
        if let Some(state) = next {
            builder.state(state);
        }
    }
}

#[tokio::test]
async fn test_disabled_check_returns_unknown_without_counting() {
    // ARRANGE: A check that went DOWN once, then got disabled
    let check = ScriptedCheck::new("disabled");
    check.set_next(Some(State::Down));
    check.call(&Options::new()).await;
    check.base().set_enabled(false);

    // ACT
    let result = check.call(&Options::new()).await;

    // ASSERT: Unknown with the fixed message, counters untouched
    assert_eq!(result.state(), State::Unknown);
    assert_eq!(result.message(), Some(DISABLED_MESSAGE));
    assert_eq!(
        result.detail(DETAIL_CHECK_ENABLED),
        Some(&serde_json::Value::Bool(false))
    );
    let meta = check.base().meta();
    assert_eq!(meta.invocation_count, 1);
    assert_eq!(meta.failure_count, 1);
    assert_eq!(meta.success_count, 0);
    assert_eq!(check.calls.load(Ordering::SeqCst), 1, "do_call must not run");
}

#[tokio::test]
async fn test_counters_follow_state_transitions() {
    let check = ScriptedCheck::new("flapping");
    let options = Options::new();

    check.set_next(Some(State::Up));
    check.call(&options).await;
    check.call(&options).await;
    let meta = check.base().meta();
    assert_eq!(meta.success_count, 2);
    assert_eq!(meta.failure_count, 0);

    check.set_next(Some(State::Down));
    let result = check.call(&options).await;
    let meta = check.base().meta();
    assert_eq!(meta.failure_count, 1);
    assert_eq!(meta.success_count, 0, "DOWN resets the success count");
    assert_eq!(result.detail(DETAIL_FAILURE_COUNT), Some(&serde_json::json!(1)));
    assert!(result.detail(DETAIL_FAILURE_TIME).is_some());

    check.set_next(Some(State::Up));
    check.call(&options).await;
    let meta = check.base().meta();
    assert_eq!(meta.success_count, 1);
    assert_eq!(meta.failure_count, 0, "UP resets the failure count");
    assert_eq!(meta.invocation_count, 4);
}

#[tokio::test]
async fn test_unset_state_yields_unknown_and_keeps_counters() {
    let check = ScriptedCheck::new("undecided");
    check.call(&Options::new()).await;

    check.set_next(None);
    let result = check.call(&Options::new()).await;

    assert_eq!(result.state(), State::Unknown);
    let meta = check.base().meta();
    assert_eq!(meta.invocation_count, 2);
    assert_eq!(meta.success_count, 1);
    assert_eq!(meta.failure_count, 0);
}

#[tokio::test]
async fn test_concurrent_calls_on_same_check_are_serialized() {
    // ARRANGE: A check that takes 50ms per call
    let mut check = ScriptedCheck::new("slow");
    check.delay = Duration::from_millis(50);
    let check = Arc::new(check);

    // ACT: Two concurrent callers
    let started = Instant::now();
    let first = {
        let check = check.clone();
        tokio::spawn(async move { check.call(&Options::new()).await })
    };
    let second = {
        let check = check.clone();
        tokio::spawn(async move { check.call(&Options::new()).await })
    };
    let (first, second) = (first.await.expect("join"), second.await.expect("join"));

    // ASSERT: One ran after the other
    assert!(started.elapsed() >= Duration::from_millis(100));
    let mut counts: Vec<_> = [first, second]
        .iter()
        .map(|r| r.detail(DETAIL_INVOCATION_COUNT).cloned())
        .collect();
    counts.sort_by_key(|v| v.as_ref().and_then(|v| v.as_u64()));
    assert_eq!(
        counts,
        vec![Some(serde_json::json!(1)), Some(serde_json::json!(2))]
    );
}

#[tokio::test]
async fn test_interval_returns_previous_result_unless_forced() {
    let check = ScriptedCheck::with_base(
        CheckBase::new(None, "throttled").with_interval(Duration::from_secs(60)),
    );

    let first = check.call(&Options::new()).await;
    let second = check.call(&Options::new()).await;
    assert_eq!(first, second);
    assert_eq!(check.calls.load(Ordering::SeqCst), 1);

    let mut forced = Options::new();
    forced.insert(OPTION_INVOCATION_FORCE.to_string(), "true".to_string());
    let third = check.call(&forced).await;
    assert_eq!(check.calls.load(Ordering::SeqCst), 2);
    assert_eq!(third.detail("call"), Some(&serde_json::json!(2)));
}

struct DowngradeToUnknown;

impl HealthCheckResultStrategy for DowngradeToUnknown {
    fn process(
        &self,
        check: &CheckBase,
        _options: &Options,
        builder: &mut HealthCheckResultBuilder,
    ) {
        if check.id() == "optional" && builder.current_state() == Some(State::Down) {
            builder.unknown().message("optional dependency unavailable");
        }
    }
}

#[tokio::test]
async fn test_context_result_strategy_post_processes_builder() {
    // ARRANGE: Context with a strategy, check bound to it
    let ctx = Arc::new(RuntimeContext::new("strategy"));
    ctx.set_result_strategy(Some(Arc::new(DowngradeToUnknown)));
    let check = ScriptedCheck::new("optional");
    check.base().bind_context(&ctx);
    check.set_next(Some(State::Down));

    // ACT
    let result = check.call(&Options::new()).await;

    // ASSERT: Result rewritten, counters still reflect the raw DOWN
    assert_eq!(result.state(), State::Unknown);
    assert_eq!(result.message(), Some("optional dependency unavailable"));
    assert_eq!(check.base().meta().failure_count, 1);
}

#[tokio::test]
async fn test_result_carries_identity() {
    let check = ScriptedCheck::new("identity");
    let result = check.call(&Options::new()).await;

    assert_eq!(result.check().id(), "identity");
    assert_eq!(result.check().group(), Some("test"));
    assert_eq!(result.check().to_string(), "test:identity");
    assert_eq!(result.detail(DETAIL_CHECK_ID), Some(&serde_json::json!("identity")));
    assert_eq!(check.order(), DEFAULT_ORDER);
}

#[test]
fn test_state_serializes_upper_case() {
    assert_eq!(serde_json::to_string(&State::Down).expect("serialize"), "\"DOWN\"");
    assert_eq!(State::Unknown.to_string(), "UNKNOWN");
}

#[tokio::test]
async fn test_panicking_check_reports_down_and_counts_failure() {
    // ARRANGE: A check that was UP once, then starts panicking
    let check = ScriptedCheck::new("explosive");
    check.call(&Options::new()).await;
    assert_eq!(check.base().meta().success_count, 1);
    check.panics.store(true, Ordering::SeqCst);

    // ACT
    let result = check.call(&Options::new()).await;

    // ASSERT: DOWN result carrying the panic, counters follow the DOWN
    assert_eq!(result.state(), State::Down);
    assert_eq!(result.detail(DETAIL_FAILURE_KIND), Some(&json!("panic")));
    assert!(result.error().is_some_and(|e| e.contains("scripted failure")));
    assert_eq!(result.detail(DETAIL_INVOCATION_COUNT), Some(&json!(2)));
    let meta = check.base().meta();
    assert_eq!(meta.failure_count, 1);
    assert_eq!(meta.success_count, 0);

    // ASSERT: The per-check lock was released
    check.panics.store(false, Ordering::SeqCst);
    let recovered = tokio::time::timeout(Duration::from_secs(1), check.call(&Options::new()))
        .await
        .expect("lock should be free after a panic");
    assert_eq!(recovered.state(), State::Up);
}

#[tokio::test]
async fn test_concurrent_calls_within_interval_invoke_once() {
    // ARRANGE: Slow check with an interval
    let mut check = ScriptedCheck::with_base(
        CheckBase::new(None, "slow-throttled").with_interval(Duration::from_secs(60)),
    );
    check.delay = Duration::from_millis(50);

    // ACT: Second caller queues on the lock while the first runs
    let (opts_a, opts_b) = (Options::new(), Options::new());
    let (first, second) = tokio::join!(check.call(&opts_a), check.call(&opts_b));

    // ASSERT: The waiting caller got the cached result
    assert_eq!(check.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

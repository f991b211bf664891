use super::ServiceStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Default number of consecutive poll errors before a consumer reports DOWN
pub const DEFAULT_CONSUMER_FAILURE_THRESHOLD: u64 = 1;

/// Consumer at the start of a route
///
/// Tracks poll outcomes so its health can be reported.
#[derive(Debug)]
pub struct Consumer {
    endpoint_uri: String,
    health_enabled: bool,
    failure_threshold: u64,
    poll_count: AtomicU64,
    consecutive_errors: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl Consumer {
    pub fn new(endpoint_uri: impl Into<String>) -> Self {
        Self {
            endpoint_uri: endpoint_uri.into(),
            health_enabled: true,
            failure_threshold: DEFAULT_CONSUMER_FAILURE_THRESHOLD,
            poll_count: AtomicU64::new(0),
            consecutive_errors: AtomicU64::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Consumers without health reporting are skipped by the consumers repository
    pub fn with_health_enabled(mut self, enabled: bool) -> Self {
        self.health_enabled = enabled;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u64) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn endpoint_uri(&self) -> &str {
        &self.endpoint_uri
    }

    pub fn is_health_enabled(&self) -> bool {
        self.health_enabled
    }

    pub fn failure_threshold(&self) -> u64 {
        self.failure_threshold
    }

    pub fn record_poll_success(&self) {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.consecutive_errors.store(0, Ordering::SeqCst);
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn record_poll_error(&self, error: impl Into<String>) {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.consecutive_errors.fetch_add(1, Ordering::SeqCst);
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error.into());
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn consecutive_errors(&self) -> u64 {
        self.consecutive_errors.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A route registered with the runtime
#[derive(Debug)]
pub struct Route {
    id: String,
    auto_startup: bool,
    status: RwLock<ServiceStatus>,
    consumer: Option<Consumer>,
}

impl Route {
    /// Create an auto-started route in the `Initialized` state
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            auto_startup: true,
            status: RwLock::new(ServiceStatus::Initialized),
            consumer: None,
        }
    }

    pub fn with_auto_startup(mut self, auto_startup: bool) -> Self {
        self.auto_startup = auto_startup;
        self
    }

    pub fn with_consumer(mut self, consumer: Consumer) -> Self {
        self.consumer = Some(consumer);
        self
    }

    pub fn with_status(self, status: ServiceStatus) -> Self {
        self.set_status(status);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_auto_startup(&self) -> bool {
        self.auto_startup
    }

    pub fn status(&self) -> ServiceStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: ServiceStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    pub fn consumer(&self) -> Option<&Consumer> {
        self.consumer.as_ref()
    }
}

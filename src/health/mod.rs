//! Health check subsystem
//!
//! - `check` - the `HealthCheck` capability and invocation bookkeeping
//! - `registry` - aggregation of checks and repositories
//! - `service` - scheduled polling, result cache and state-change listeners
//! - `resolver` - explicit discovery table for checks by id
//! - `helper` - direct invocation by probe kind

pub mod checks;
pub mod helper;

mod check;
mod registry;
mod repository;
mod resolver;
mod result;
mod service;

pub use check::{
    CheckBase, CheckMeta, HealthCheck, HealthCheckResultStrategy, Options, DEFAULT_ORDER,
    DETAIL_CHECK_ENABLED, DETAIL_CHECK_GROUP, DETAIL_CHECK_ID, DETAIL_FAILURE_COUNT,
    DETAIL_FAILURE_KIND, DETAIL_FAILURE_TIME, DETAIL_INVOCATION_COUNT, DETAIL_INVOCATION_TIME,
    DETAIL_SUCCESS_COUNT, DETAIL_SUCCESS_TIME, DISABLED_MESSAGE, OPTION_INVOCATION_FORCE,
};
pub use registry::{HealthCheckRegistry, Registrable};
pub use repository::HealthCheckRepository;
pub use resolver::{CheckFactory, HealthCheckResolver, RepositoryFactory};
pub use result::{CheckIdentity, HealthCheckResult, HealthCheckResultBuilder, State};
pub use service::{
    HealthCheckService, ServiceConfig, StateChangeListener, DEFAULT_CHECK_INTERVAL,
    DEFAULT_CHECK_TIMEOUT,
};

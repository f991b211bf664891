//! Error types
//!
//! Check failures are never errors: they travel as `HealthCheckResult`s.
//! These types cover wiring and configuration mistakes only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Object is neither a health check nor a health check repository")]
    NotAccepted,

    #[error("Factory already registered: {0}")]
    DuplicateFactory(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

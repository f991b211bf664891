pub mod config;
pub mod error;
pub mod health;
pub mod runtime;
pub mod server;

pub use crate::config::{ExposureLevel, HealthConfig};
pub use crate::error::{ConfigError, HealthError};

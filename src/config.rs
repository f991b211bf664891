//! Environment-driven configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `VIGIL_HEALTH_PORT` | `8080` |
//! | `VIGIL_CHECK_INTERVAL_MS` | `30000` |
//! | `VIGIL_CHECK_TIMEOUT_MS` | `10000` |
//! | `VIGIL_REGISTRY_ENABLED` | `true` |
//! | `VIGIL_EXPOSURE_LEVEL` | `default` |
//! | `VIGIL_EXCLUDED_ROUTES` | empty |

use crate::error::ConfigError;
use crate::health::{ServiceConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_CHECK_TIMEOUT};
use std::str::FromStr;
use std::time::Duration;

/// Default port for health endpoints
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// How much of a result the HTTP endpoints reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposureLevel {
    /// Overall status plus per-check state; message and error for failing checks
    #[default]
    Default,
    /// Everything, including details
    Full,
    /// Overall status only
    Oneline,
}

impl FromStr for ExposureLevel {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(ExposureLevel::Default),
            "full" => Ok(ExposureLevel::Full),
            "oneline" => Ok(ExposureLevel::Oneline),
            _ => Err(ConfigError::InvalidValue {
                key: "VIGIL_EXPOSURE_LEVEL".to_string(),
                value: value.to_string(),
                reason: "expected one of default, full, oneline".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthConfig {
    pub port: u16,
    pub check_interval: Duration,
    pub check_timeout: Duration,
    pub registry_enabled: bool,
    pub exposure_level: ExposureLevel,
    /// Route id patterns skipped by the routes repository (`*` wildcard)
    pub excluded_routes: Vec<String>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HEALTH_PORT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            registry_enabled: true,
            exposure_level: ExposureLevel::Default,
            excluded_routes: Vec::new(),
        }
    }
}

impl HealthConfig {
    /// Read configuration from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys take their default
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("VIGIL_HEALTH_PORT") {
            config.port = parse("VIGIL_HEALTH_PORT", &value)?;
        }
        if let Some(value) = lookup("VIGIL_CHECK_INTERVAL_MS") {
            config.check_interval = parse_millis("VIGIL_CHECK_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("VIGIL_CHECK_TIMEOUT_MS") {
            config.check_timeout = parse_millis("VIGIL_CHECK_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("VIGIL_REGISTRY_ENABLED") {
            config.registry_enabled = parse("VIGIL_REGISTRY_ENABLED", &value)?;
        }
        if let Some(value) = lookup("VIGIL_EXPOSURE_LEVEL") {
            config.exposure_level = value.parse()?;
        }
        if let Some(value) = lookup("VIGIL_EXCLUDED_ROUTES") {
            config.excluded_routes = value
                .split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            check_interval: self.check_interval,
            check_timeout: self.check_timeout,
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let millis: u64 = parse(key, value)?;
    if millis == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_millis(millis))
}

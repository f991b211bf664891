//! Health check results and their builder

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Observed state of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Up,
    Down,
    Unknown,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Up => "UP",
            State::Down => "DOWN",
            State::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(group, id)` pair identifying a check
///
/// The id is unique within a registry and never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    id: String,
}

impl CheckIdentity {
    pub fn new(group: Option<&str>, id: impl Into<String>) -> Self {
        Self {
            group: group.map(str::to_string),
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

impl fmt::Display for CheckIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}:{}", group, self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// Outcome of one check invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    check: CheckIdentity,
    state: State,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    details: BTreeMap<String, Value>,
}

impl HealthCheckResult {
    pub fn check(&self) -> &CheckIdentity {
        &self.check
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

/// Mutable builder handed to a check while it runs
///
/// A builder whose state was never set produces an `Unknown` result.
#[derive(Debug, Clone)]
pub struct HealthCheckResultBuilder {
    check: CheckIdentity,
    state: Option<State>,
    message: Option<String>,
    error: Option<String>,
    details: BTreeMap<String, Value>,
}

impl HealthCheckResultBuilder {
    pub fn on(check: CheckIdentity) -> Self {
        Self {
            check,
            state: None,
            message: None,
            error: None,
            details: BTreeMap::new(),
        }
    }

    pub fn up(&mut self) -> &mut Self {
        self.state(State::Up)
    }

    pub fn down(&mut self) -> &mut Self {
        self.state(State::Down)
    }

    pub fn unknown(&mut self) -> &mut Self {
        self.state(State::Unknown)
    }

    pub fn state(&mut self, state: State) -> &mut Self {
        self.state = Some(state);
        self
    }

    pub fn current_state(&self) -> Option<State> {
        self.state
    }

    pub fn message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(&mut self, error: impl fmt::Display) -> &mut Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn detail(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn build(&self) -> HealthCheckResult {
        HealthCheckResult {
            check: self.check.clone(),
            state: self.state.unwrap_or(State::Unknown),
            message: self.message.clone(),
            error: self.error.clone(),
            details: self.details.clone(),
        }
    }
}

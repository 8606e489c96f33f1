//! Engine configuration.
//!
//! All fields have defaults, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! poll_interval_ms = 3000
//! scoped_variables = "reset"
//! contain_panics = true
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default bound on how long a blocked container waits before re-checking
/// preemption.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Errors that can occur when loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse engine configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// Whether scoped-variable values survive from one run into the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopedVariablePolicy {
    /// Re-seed every scoped variable from its default at the start of a run.
    #[default]
    Reset,

    /// Keep the value written by the previous run.
    Persist,
}

/// Runtime configuration shared by every state of a tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bounded wait used while blocked on a missing transition or a paused gate.
    pub poll_interval_ms: u64,

    pub scoped_variables: ScopedVariablePolicy,

    /// Convert panics raised by children into the `aborted` outcome.
    pub contain_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            scoped_variables: ScopedVariablePolicy::default(),
            contain_panics: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML, filling missing fields with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        if config.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn with_scoped_variables(mut self, policy: ScopedVariablePolicy) -> Self {
        self.scoped_variables = policy;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

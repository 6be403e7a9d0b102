//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::ratelimit::Policy;

/// Behavior when the counter store cannot be consulted.
///
/// Only reachable with a pluggable remote store, since the in-memory store
/// cannot fail. The default denies requests, so a store outage never
/// silently lifts the limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Deny requests while the store is unavailable
    #[default]
    FailClosed,
    /// Admit requests while the store is unavailable
    FailOpen,
}

/// Main configuration for the Turnstile engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Policy overrides merged over the built-in table, keyed by policy name
    #[serde(default)]
    pub policies: HashMap<String, Policy>,

    /// Seconds between sweeps of expired counters; 0 disables the
    /// periodic sweep
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Behavior when the counter store cannot be consulted
    #[serde(default)]
    pub failure_mode: FailureMode,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            policies: HashMap::new(),
            sweep_interval_secs: default_sweep_interval(),
            failure_mode: FailureMode::default(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}

impl TurnstileConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| crate::error::TurnstileError::Config(e.to_string()))
    }

    /// The sweep interval as a [`Duration`], or `None` when the periodic
    /// sweep is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        if self.sweep_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.sweep_interval_secs))
        }
    }
}

//! Engine configuration.
//!
//! Every field has a default matching the timings the replay engine has always used,
//! so an empty JSON object (or no file at all) yields a working configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// What the interpreter does when the graph ends somewhere other than `end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedGraphPolicy {
    /// A missing edge, dangling target or cycle ends the run as completed, with a warning.
    #[default]
    ImplicitEnd,
    /// The same conditions are reported as errors.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 10,
        }
    }
}

impl LocatorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Fixed delays standing in for "wait for the page to settle".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// After every successful step.
    pub settle_ms: u64,
    /// Between the two Enter presses of `select`.
    pub select_confirm_ms: u64,
    /// Before the terminal paste.
    pub pre_paste_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            select_confirm_ms: 1000,
            pre_paste_ms: 2000,
        }
    }
}

impl PacingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn select_confirm(&self) -> Duration {
        Duration::from_millis(self.select_confirm_ms)
    }

    pub fn pre_paste(&self) -> Duration {
        Duration::from_millis(self.pre_paste_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub locator: LocatorConfig,
    pub pacing: PacingConfig,
    pub malformed_graph: MalformedGraphPolicy,
    /// Fail compilation on step nodes with an unknown interaction type instead of skipping them.
    pub reject_unknown_actions: bool,
    pub debugger_protocol: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locator: LocatorConfig::default(),
            pacing: PacingConfig::default(),
            malformed_graph: MalformedGraphPolicy::default(),
            reject_unknown_actions: false,
            debugger_protocol: "1.3".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

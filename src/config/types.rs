//! Configuration types and defaults for statelock.
//!
//! This module defines the backend selection enum, default value functions,
//! and the serde adapter for human-readable durations used by the Config struct.

use crate::locks::{DEFAULT_RETRY_INITIAL_DELAY, DEFAULT_RETRY_MAX_DELAY};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default local state file name.
pub const DEFAULT_STATE_FILE: &str = "terraform.tfstate";

/// Directory holding local state for non-default workspaces.
pub const LOCAL_WORKSPACE_DIR: &str = "terraform.tfstate.d";

/// Where the state lives and, by extension, who arbitrates its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// State in a local file. Locking is redundant.
    Local {
        #[serde(default = "default_state_path")]
        path: PathBuf,
    },

    /// State in a directory shared between machines, locked with lock files.
    SharedDir { path: PathBuf },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            path: default_state_path(),
        }
    }
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Local { .. } => "local",
            BackendConfig::SharedDir { .. } => "shared_dir",
        }
    }
}

pub fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

pub fn default_lock_timeout() -> Duration {
    Duration::ZERO
}

pub fn default_retry_initial_delay() -> Duration {
    DEFAULT_RETRY_INITIAL_DELAY
}

pub fn default_retry_max_delay() -> Duration {
    DEFAULT_RETRY_MAX_DELAY
}

/// Serde adapter for durations written as `"500ms"`, `"10s"`, `"2m"`.
pub(crate) mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(|e| {
            serde::de::Error::custom(format!("invalid duration '{}': {}", raw, e))
        })
    }
}

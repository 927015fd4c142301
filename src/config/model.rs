//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "statelock.yaml";

/// Configuration for statelock.
///
/// This struct represents the contents of `statelock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage backend holding the state.
    pub backend: BackendConfig,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// How long to keep retrying a contended lock (`0s` tries once).
    #[serde(with = "human_duration", default = "default_lock_timeout")]
    pub lock_timeout: Duration,

    /// Delay before the first retry; doubles after every conflict.
    #[serde(with = "human_duration", default = "default_retry_initial_delay")]
    pub retry_initial_delay: Duration,

    /// Upper bound for the delay between retries.
    #[serde(with = "human_duration", default = "default_retry_max_delay")]
    pub retry_max_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            lock_timeout: default_lock_timeout(),
            retry_initial_delay: default_retry_initial_delay(),
            retry_max_delay: default_retry_max_delay(),
        }
    }
}

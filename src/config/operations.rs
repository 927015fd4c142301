//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::BackendConfig;
use crate::error::{Result, StateLockError};
use crate::locks::RetryPolicy;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(StateLockError::ConfigError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            StateLockError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is `null`, which serde_yaml won't map onto a struct
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| StateLockError::ConfigError(format!("failed to parse YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    #[cfg(test)]
    pub(crate) fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StateLockError::ConfigError(format!("failed to serialize YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - backend paths must be non-empty
    /// - `retry_initial_delay` must be positive
    /// - `retry_max_delay` must not be below `retry_initial_delay`
    pub fn validate(&self) -> Result<()> {
        let backend_path = match &self.backend {
            BackendConfig::Local { path } | BackendConfig::SharedDir { path } => path,
        };
        if backend_path.as_os_str().is_empty() {
            return Err(StateLockError::ConfigError(format!(
                "backend.path must not be empty for the {} backend",
                self.backend.name()
            )));
        }

        if self.retry_initial_delay.is_zero() {
            return Err(StateLockError::ConfigError(
                "retry_initial_delay must be greater than 0".to_string(),
            ));
        }

        if self.retry_max_delay < self.retry_initial_delay {
            return Err(StateLockError::ConfigError(format!(
                "retry_max_delay ({}) must not be less than retry_initial_delay ({})",
                humantime::format_duration(self.retry_max_delay),
                humantime::format_duration(self.retry_initial_delay)
            )));
        }

        Ok(())
    }

    /// Backoff policy for contended locks.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_initial_delay, self.retry_max_delay)
    }
}

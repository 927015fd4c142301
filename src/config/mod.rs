//! Configuration model for statelock.
//!
//! This module defines the Config struct that represents `statelock.yaml` in
//! the configuration directory. It supports forward-compatible YAML parsing
//! (unknown fields are ignored), sensible defaults for optional fields, and
//! validation of config values.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::{CONFIG_FILE_NAME, Config};
pub use types::BackendConfig;

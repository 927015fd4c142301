//! Error types for the statelock CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for statelock commands.
///
/// Each variant maps to a specific exit code; see [`crate::exit_codes`].
#[derive(Error, Debug)]
pub enum StateLockError {
    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be read, parsed, or validated.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The backend failed for a reason unrelated to lock contention.
    #[error("Backend failure: {0}")]
    BackendError(String),

    /// Lock could not be acquired.
    #[error("Error acquiring the state lock: {0}")]
    LockError(String),

    /// The user interrupted the wait.
    #[error("{0}")]
    Cancelled(String),
}

impl StateLockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            StateLockError::UserError(_) => exit_codes::USER_ERROR,
            StateLockError::ConfigError(_) => exit_codes::CONFIG_FAILURE,
            StateLockError::BackendError(_) => exit_codes::BACKEND_FAILURE,
            StateLockError::LockError(_) => exit_codes::LOCK_FAILURE,
            StateLockError::Cancelled(_) => exit_codes::CANCELLED,
        }
    }
}

/// Result type alias for statelock commands.
pub type Result<T> = std::result::Result<T, StateLockError>;

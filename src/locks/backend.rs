//! The capability a storage backend provides to the lock coordinator.

use super::descriptor::LockDescriptor;
use std::path::PathBuf;
use thiserror::Error;

/// Backend answer to a single claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    /// The target is now held by the requesting descriptor.
    Claimed,

    /// Someone else holds the target. `None` when the holder record could
    /// not be read yet (e.g. another writer is mid-way through creating it).
    Conflict(Option<LockDescriptor>),
}

/// Backend failure unrelated to lock contention. Never retried.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed lock record '{}': {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("invalid state key '{0}'")]
    InvalidKey(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BackendError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A storage backend able to arbitrate exclusive access to state.
///
/// Implementations must tolerate repeated `claim` calls for the same target
/// and descriptor: a claim against a lock already held by that descriptor
/// reports [`ClaimStatus::Claimed`].
pub trait LockBackend: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Attempt to atomically claim `key` for `descriptor`.
    fn claim(&self, key: &str, descriptor: &LockDescriptor) -> Result<ClaimStatus, BackendError>;

    /// Best-effort release of any claim on `key` made by exactly `descriptor`.
    ///
    /// Called when the caller gives up waiting. Must never touch a lock held
    /// by a different descriptor.
    fn abandon(&self, _key: &str, _descriptor: &LockDescriptor) -> Result<(), BackendError> {
        Ok(())
    }
}

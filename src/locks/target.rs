//! Storage targets: the state a lock protects.

use super::backend::LockBackend;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// The state resource a lock request is about.
///
/// Whether a target can be locked is decided when the target is resolved,
/// not by inspecting the backend at acquisition time.
#[derive(Clone)]
pub enum StateTarget {
    /// State in a local file. Only one process on one machine can touch it,
    /// so locking is redundant and no backend is ever contacted.
    LocalOnly { path: PathBuf },

    /// State behind a backend that arbitrates exclusive access.
    Shared {
        /// Backend-specific key of the state (e.g. `default.tfstate`).
        key: String,
        backend: Arc<dyn LockBackend>,
    },
}

impl StateTarget {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        StateTarget::LocalOnly { path: path.into() }
    }

    pub fn shared(key: impl Into<String>, backend: Arc<dyn LockBackend>) -> Self {
        StateTarget::Shared {
            key: key.into(),
            backend,
        }
    }

    /// Whether acquiring a lock on this target means anything.
    pub fn supports_locking(&self) -> bool {
        matches!(self, StateTarget::Shared { .. })
    }

    /// Identifier recorded in lock descriptors.
    pub fn key(&self) -> String {
        match self {
            StateTarget::LocalOnly { path } => path.display().to_string(),
            StateTarget::Shared { key, .. } => key.clone(),
        }
    }
}

impl fmt::Debug for StateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateTarget::LocalOnly { path } => {
                f.debug_struct("LocalOnly").field("path", path).finish()
            }
            StateTarget::Shared { key, backend } => f
                .debug_struct("Shared")
                .field("key", key)
                .field("backend", &backend.name())
                .finish(),
        }
    }
}

impl fmt::Display for StateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateTarget::LocalOnly { path } => write!(f, "local state '{}'", path.display()),
            StateTarget::Shared { key, backend } => write!(f, "{} state '{}'", backend.name(), key),
        }
    }
}

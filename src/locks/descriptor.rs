//! Lock descriptors and lock requests.

use super::target::StateTarget;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operation label used by `statelock state lock`.
pub const STATE_LOCK_OPERATION: &str = "state-lock";

/// Metadata identifying a lock request or the current holder of a lock.
///
/// Backends persist this record next to the state they protect, so the field
/// names are fixed (`ID`, `Operation`, `Info`, `Who`, `Version`, `Created`,
/// `Path`) and must not change between releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LockDescriptor {
    /// Unique identifier of this request. Reported back on success.
    #[serde(rename = "ID")]
    pub id: String,

    /// Why the lock was requested (e.g. `state-lock`).
    pub operation: String,

    /// Optional free-form note from the requester.
    #[serde(default)]
    pub info: String,

    /// Requester identity (`user@host`).
    pub who: String,

    /// Version of the tool that created the lock.
    pub version: String,

    /// When the descriptor was built.
    pub created: DateTime<Utc>,

    /// The state being locked.
    pub path: String,
}

impl LockDescriptor {
    /// Build a fresh descriptor for `operation` on `target`.
    ///
    /// Every call generates a new random lock ID. Retries of one logical
    /// request must reuse the same descriptor.
    pub fn build(operation: &str, target: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            info: String::new(),
            who: get_owner_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created: Utc::now(),
            path: target.to_string(),
        }
    }

    /// Attach a free-form note.
    #[cfg(test)]
    pub(crate) fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Calculate the age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }
}

impl std::fmt::Display for LockDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lock Info:")?;
        writeln!(f, "  ID:        {}", self.id)?;
        writeln!(f, "  Path:      {}", self.path)?;
        writeln!(f, "  Operation: {}", self.operation)?;
        writeln!(f, "  Who:       {}", self.who)?;
        writeln!(f, "  Version:   {}", self.version)?;
        writeln!(
            f,
            "  Created:   {} ({} ago)",
            self.created.format("%Y-%m-%d %H:%M:%S%.f UTC"),
            self.age_string()
        )?;
        write!(f, "  Info:      {}", self.info)
    }
}

/// A request to lock one target, created fresh per invocation.
#[derive(Debug)]
pub struct LockRequest {
    /// What is being locked.
    pub target: StateTarget,

    /// Why the lock is being requested.
    pub operation: String,

    /// Descriptor sent to the backend on every attempt.
    pub info: LockDescriptor,
}

impl LockRequest {
    pub fn new(target: StateTarget, operation: &str) -> Self {
        let info = LockDescriptor::build(operation, &target.key());
        Self {
            target,
            operation: operation.to_string(),
            info,
        }
    }

    /// The lock ID that will be reported if this request succeeds.
    pub fn lock_id(&self) -> &str {
        &self.info.id
    }
}

/// Get the requester identity (`user@host`).
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

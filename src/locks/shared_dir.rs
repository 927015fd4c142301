//! Shared-directory lock backend.
//!
//! State lives in a directory visible to every machine that runs statelock
//! (an NFS mount, a synced volume). A lock is a `<key>.lock` file next to the
//! state, created with **create_new** semantics (exclusive create) so only one
//! process can hold it. The file contains the holder's JSON descriptor.

use super::backend::{BackendError, ClaimStatus, LockBackend};
use super::descriptor::LockDescriptor;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lock backend storing lock records as files in a shared directory.
#[derive(Debug, Clone)]
pub struct SharedDirBackend {
    root: PathBuf,
}

/// Result of reading an existing lock file.
enum HolderRecord {
    Present(LockDescriptor),
    /// The file exists but is still empty: its creator has not written it yet.
    Pending,
    /// The file disappeared between our create attempt and the read.
    Gone,
}

impl SharedDirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the lock file guarding `key`.
    pub fn lock_path(&self, key: &str) -> Result<PathBuf, BackendError> {
        if key.is_empty()
            || key.contains(['/', '\\'])
            || key == "."
            || key == ".."
        {
            return Err(BackendError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.lock", key)))
    }

    /// Read the descriptor of whoever currently holds `key`, if anyone.
    #[cfg(test)]
    pub(crate) fn holder(&self, key: &str) -> Result<Option<LockDescriptor>, BackendError> {
        let lock_path = self.lock_path(key)?;
        match read_holder(&lock_path)? {
            HolderRecord::Present(holder) => Ok(Some(holder)),
            HolderRecord::Pending | HolderRecord::Gone => Ok(None),
        }
    }
}

impl LockBackend for SharedDirBackend {
    fn name(&self) -> &str {
        "shared_dir"
    }

    fn claim(&self, key: &str, descriptor: &LockDescriptor) -> Result<ClaimStatus, BackendError> {
        let lock_path = self.lock_path(key)?;

        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| {
                BackendError::io(
                    format!("failed to create lock directory '{}'", self.root.display()),
                    e,
                )
            })?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return match read_holder(&lock_path)? {
                    HolderRecord::Present(holder) if holder.id == descriptor.id => {
                        debug!(lock_id = %descriptor.id, "lock already held by this request");
                        Ok(ClaimStatus::Claimed)
                    }
                    HolderRecord::Present(holder) => Ok(ClaimStatus::Conflict(Some(holder))),
                    HolderRecord::Pending | HolderRecord::Gone => Ok(ClaimStatus::Conflict(None)),
                };
            }
            Err(e) => {
                return Err(BackendError::io(
                    format!("failed to create lock file '{}'", lock_path.display()),
                    e,
                ));
            }
        };

        let json = serde_json::to_string_pretty(descriptor).map_err(|e| {
            let _ = fs::remove_file(&lock_path);
            BackendError::Other(format!("failed to serialize lock descriptor: {}", e))
        })?;

        file.write_all(json.as_bytes()).map_err(|e| {
            // Don't leave a half-written claim behind
            let _ = fs::remove_file(&lock_path);
            BackendError::io("failed to write lock descriptor", e)
        })?;

        file.sync_all().map_err(|e| {
            let _ = fs::remove_file(&lock_path);
            BackendError::io("failed to sync lock file", e)
        })?;

        Ok(ClaimStatus::Claimed)
    }

    fn abandon(&self, key: &str, descriptor: &LockDescriptor) -> Result<(), BackendError> {
        let lock_path = self.lock_path(key)?;

        match read_holder(&lock_path)? {
            HolderRecord::Present(holder) if holder.id == descriptor.id => {
                fs::remove_file(&lock_path).map_err(|e| {
                    BackendError::io(
                        format!("failed to remove lock file '{}'", lock_path.display()),
                        e,
                    )
                })?;
                warn!(
                    lock_id = %descriptor.id,
                    path = %lock_path.display(),
                    "removed lock claimed by an abandoned request"
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn read_holder(lock_path: &Path) -> Result<HolderRecord, BackendError> {
    let content = match fs::read_to_string(lock_path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HolderRecord::Gone),
        Err(e) => {
            return Err(BackendError::io(
                format!("failed to read lock file '{}'", lock_path.display()),
                e,
            ));
        }
    };

    if content.trim().is_empty() {
        return Ok(HolderRecord::Pending);
    }

    serde_json::from_str(&content)
        .map(HolderRecord::Present)
        .map_err(|e| BackendError::Malformed {
            path: lock_path.to_path_buf(),
            reason: e.to_string(),
        })
}

//! State locking for statelock.
//!
//! This module implements the advisory lock protocol that keeps two processes
//! from mutating the same shared state at once:
//! - [`LockDescriptor`]: who is asking, why, and when (plus a unique lock ID)
//! - [`StateTarget`]: the state being protected, tagged with whether locking
//!   applies to it at all
//! - [`LockBackend`]: the one capability a storage backend must provide
//!   (`claim`), with [`SharedDirBackend`] as the bundled implementation
//! - [`LockCoordinator`]: retries contended claims with exponential backoff
//!   until success, timeout, or cancellation
//!
//! # Local State
//!
//! State stored in a local file can only be touched by one process on one
//! machine, so locking it is redundant. Such targets resolve to
//! [`StateTarget::LocalOnly`] and the coordinator answers
//! [`LockOutcome::Unsupported`] without contacting any backend.
//!
//! # Lifetime of a Lock
//!
//! A successfully acquired lock belongs to the backend. The coordinator only
//! reports its ID and never releases it; the lock outlives this process.

mod backend;
mod cancel;
mod coordinator;
mod descriptor;
mod shared_dir;
mod target;

#[cfg(test)]
mod tests;

// Re-export public API
pub use backend::{BackendError, ClaimStatus, LockBackend};
pub use cancel::CancelSignal;
pub use coordinator::{
    DEFAULT_RETRY_INITIAL_DELAY, DEFAULT_RETRY_MAX_DELAY, LockCoordinator, LockOutcome,
    RetryPolicy,
};
pub use descriptor::{LockDescriptor, LockRequest, STATE_LOCK_OPERATION};
pub use shared_dir::SharedDirBackend;
pub use target::StateTarget;

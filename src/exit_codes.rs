//! Exit code constants for the statelock CLI.
//!
//! - 0: Success (including "locking is redundant" for local state)
//! - 1: User error (bad args, invalid state)
//! - 2: Configuration could not be loaded or validated
//! - 3: Backend failure (transport, permission, malformed lock record)
//! - 4: Lock acquisition failure (held by someone else until the timeout)
//! - 130: Interrupted by the user while waiting for the lock

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// Configuration error: unreadable or invalid `statelock.yaml`.
pub const CONFIG_FAILURE: i32 = 2;

/// Backend failure unrelated to lock contention.
pub const BACKEND_FAILURE: i32 = 3;

/// Lock acquisition failure: the state lock is held by another process.
pub const LOCK_FAILURE: i32 = 4;

/// The wait was cancelled (SIGINT convention).
pub const CANCELLED: i32 = 130;

//! Rendering of lock outcomes for the `state lock` command.

use crate::error::{Result, StateLockError};
use crate::locks::{LockOutcome, LockRequest};
use std::io::Write;
use std::time::Duration;

const LOCK_HELP: &str = "\
statelock acquires a state lock to protect the state from being written
by multiple users at the same time. Wait for the current holder to finish
(or contact them), then try again. Use --lock-timeout to keep retrying
for longer.";

/// Print a successful outcome, or turn a failed one into an error.
pub(super) fn report_outcome(
    outcome: LockOutcome,
    request: &LockRequest,
    timeout: Duration,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    match outcome {
        LockOutcome::Acquired { lock_id } => {
            write!(
                out,
                "LOCKID: {}\n\n\
                 State has been successfully locked!\n\n\
                 The state has been locked, and other statelock commands should now be\n\
                 blocked from obtaining a new lock on {}.\n",
                lock_id, request.target
            )
            .map_err(output_error)
        }
        LockOutcome::Unsupported => {
            writeln!(err, "Local state locking is redundant.").map_err(output_error)
        }
        LockOutcome::TimedOut { last_conflict } => {
            let headline = if timeout.is_zero() {
                "the state is locked by another process".to_string()
            } else {
                format!(
                    "timed out after {} waiting for the lock",
                    humantime::format_duration(timeout)
                )
            };
            let holder = match last_conflict {
                Some(holder) => holder.to_string(),
                None => "Lock Info: unavailable (the lock record could not be read)".to_string(),
            };
            Err(StateLockError::LockError(format!(
                "{}\n\n{}\n\n{}",
                headline, holder, LOCK_HELP
            )))
        }
        LockOutcome::Cancelled => Err(StateLockError::Cancelled(
            "interrupted while waiting for the state lock; no lock was acquired".to_string(),
        )),
        LockOutcome::Failed { cause } => Err(StateLockError::BackendError(format!(
            "{}\n\nThe state was not locked. Resolve the error above and try again.",
            cause
        ))),
    }
}

fn output_error(e: std::io::Error) -> StateLockError {
    StateLockError::UserError(format!("failed to write output: {}", e))
}

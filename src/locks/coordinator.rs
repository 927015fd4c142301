//! The lock coordinator: retry, timeout, and cancellation around a backend claim.
//!
//! One call to [`LockCoordinator::acquire`] drives one [`LockRequest`] from its
//! first claim attempt to a terminal [`LockOutcome`]:
//!
//! ```text
//! Idle -> Requesting -> Acquired
//!                    -> Failed
//!                    -> Conflicted -> Requesting (after backoff)
//!                                  -> TimedOut
//!                                  -> Cancelled
//! ```
//!
//! Claim attempts are strictly sequential. Between attempts the coordinator
//! sleeps on the [`CancelSignal`], so raising the signal cuts a backoff short.

use super::backend::{BackendError, ClaimStatus, LockBackend};
use super::cancel::CancelSignal;
use super::descriptor::{LockDescriptor, LockRequest};
use super::target::StateTarget;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default delay before the first retry.
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for the delay between retries.
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(16);

/// Terminal result of a lock acquisition.
#[derive(Debug)]
pub enum LockOutcome {
    /// The backend granted the lock.
    Acquired { lock_id: String },

    /// The target never needs a lock (local, single-user state).
    Unsupported,

    /// The lock was still held by someone else when the wait budget ran out.
    TimedOut {
        last_conflict: Option<LockDescriptor>,
    },

    /// The caller aborted the wait.
    Cancelled,

    /// The backend failed for a reason other than contention.
    Failed { cause: BackendError },
}

impl LockOutcome {
    /// Whether the caller may proceed as if it holds the state.
    pub fn is_success(&self) -> bool {
        matches!(self, LockOutcome::Acquired { .. } | LockOutcome::Unsupported)
    }

    pub fn lock_id(&self) -> Option<&str> {
        match self {
            LockOutcome::Acquired { lock_id } => Some(lock_id),
            _ => None,
        }
    }
}

/// Exponential backoff between claim attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// Delay to use after one that lasted `current`: doubled, capped.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INITIAL_DELAY, DEFAULT_RETRY_MAX_DELAY)
    }
}

type WaitNotice<'a> = Box<dyn Fn(Option<&LockDescriptor>) + 'a>;

/// Drives lock requests against their backend.
///
/// The wait notice may borrow from the caller (an output stream, say), so a
/// coordinator lives no longer than one command invocation.
#[derive(Default)]
pub struct LockCoordinator<'a> {
    policy: RetryPolicy,
    wait_notice: Option<WaitNotice<'a>>,
}

impl<'a> LockCoordinator<'a> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            wait_notice: None,
        }
    }

    /// Call `notice` once, the first time a request has to wait for a holder.
    pub fn with_wait_notice<F>(mut self, notice: F) -> Self
    where
        F: Fn(Option<&LockDescriptor>) + 'a,
    {
        self.wait_notice = Some(Box::new(notice));
        self
    }

    /// Acquire the lock described by `request`.
    ///
    /// A zero `timeout` makes exactly one claim attempt. The timeout is
    /// wall-clock from the first attempt and includes backoff sleeps.
    ///
    /// If `cancel` is raised after the backend has already accepted a claim,
    /// the outcome is still [`LockOutcome::Acquired`]: the lock is real and
    /// the caller has to release it.
    pub fn acquire(
        &self,
        request: &LockRequest,
        timeout: Duration,
        cancel: &CancelSignal,
    ) -> LockOutcome {
        let (key, backend) = match &request.target {
            StateTarget::LocalOnly { path } => {
                debug!(path = %path.display(), "local state, skipping lock");
                return LockOutcome::Unsupported;
            }
            StateTarget::Shared { key, backend } => (key.as_str(), backend.as_ref()),
        };

        let descriptor = &request.info;
        let started = Instant::now();
        // None: the budget is too large to represent, i.e. unbounded.
        let deadline = started.checked_add(timeout);
        let mut delay = self.policy.initial_delay;
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return self.cancelled(backend, key, descriptor, attempts);
            }

            attempts += 1;
            debug!(
                attempt = attempts,
                backend = backend.name(),
                key,
                lock_id = %descriptor.id,
                "claiming state lock"
            );

            let holder = match backend.claim(key, descriptor) {
                Ok(ClaimStatus::Claimed) => {
                    if cancel.is_cancelled() {
                        warn!(
                            lock_id = %descriptor.id,
                            "cancelled after the backend accepted the claim; the lock is held and must be released manually"
                        );
                    }
                    info!(lock_id = %descriptor.id, attempts, "state lock acquired");
                    return LockOutcome::Acquired {
                        lock_id: descriptor.id.clone(),
                    };
                }
                Ok(ClaimStatus::Conflict(holder)) => holder,
                Err(cause) => {
                    warn!(attempt = attempts, error = %cause, "state lock backend failed");
                    return LockOutcome::Failed { cause };
                }
            };

            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|r| r.is_zero()) {
                info!(
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "timed out waiting for state lock"
                );
                return LockOutcome::TimedOut {
                    last_conflict: holder,
                };
            }

            if attempts == 1
                && let Some(notice) = &self.wait_notice
            {
                notice(holder.as_ref());
            }

            let sleep = remaining.map_or(delay, |r| delay.min(r));
            debug!(
                holder = holder.as_ref().map(|h| h.who.as_str()).unwrap_or("unknown"),
                backoff_ms = sleep.as_millis() as u64,
                "state lock is held, backing off"
            );

            if cancel.wait_timeout(sleep) {
                return self.cancelled(backend, key, descriptor, attempts);
            }
            delay = self.policy.next_delay(delay);
        }
    }

    fn cancelled(
        &self,
        backend: &dyn LockBackend,
        key: &str,
        descriptor: &LockDescriptor,
        attempts: u32,
    ) -> LockOutcome {
        if attempts > 0
            && let Err(e) = backend.abandon(key, descriptor)
        {
            warn!(
                lock_id = %descriptor.id,
                error = %e,
                "failed to abandon state lock claim after cancellation"
            );
        }
        info!(attempts, "state lock wait cancelled");
        LockOutcome::Cancelled
    }
}

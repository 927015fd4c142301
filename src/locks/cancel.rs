//! Cancellation signal shared between the coordinator and whoever can abort it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A one-shot cancellation flag that can interrupt a sleeping waiter.
///
/// Clones share the same flag. Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake any waiter.
    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *lock(flag) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Sleep for `duration` unless the signal is raised first.
    ///
    /// Returns `true` if the signal was raised (before or during the wait).
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = lock(flag);

        while !*cancelled {
            cancelled = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    match cvar.wait_timeout(cancelled, remaining) {
                        Ok((guard, _)) => guard,
                        Err(poison) => poison.into_inner().0,
                    }
                }
                None => cvar.wait(cancelled).unwrap_or_else(|poison| poison.into_inner()),
            };
        }

        *cancelled
    }
}

fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    // A poisoned flag is still a valid bool.
    flag.lock().unwrap_or_else(|poison| poison.into_inner())
}

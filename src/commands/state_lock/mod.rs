//! Implementation of the `statelock state lock` command.
//!
//! Manually locks the state of the current workspace:
//! 1. Resolve the configuration directory and workspace
//! 2. Load `statelock.yaml` and apply the `--lock-timeout` / `--state` overrides
//! 3. Resolve the state target (local state short-circuits: nothing to lock)
//! 4. Run the lock coordinator until the lock is acquired, the timeout
//!    expires, or the user interrupts the wait
//! 5. Print the lock ID, or a diagnostic naming the current holder
//!
//! The acquired lock stays in place when the command exits.

mod report;


use crate::cli::StateLockArgs;
use crate::config::Config;
use crate::context::StateContext;
use crate::error::Result;
use crate::interrupt::cancel_on_interrupt;
use crate::locks::{CancelSignal, LockCoordinator, LockRequest, STATE_LOCK_OPERATION};
use std::cell::RefCell;
use std::io::{self, Write};
use tracing::{debug, info, warn};

pub fn cmd_state_lock(args: StateLockArgs) -> Result<()> {
    let ctx = StateContext::resolve(args.dir.as_deref())?;

    let cancel = CancelSignal::new();
    if let Err(e) = cancel_on_interrupt(cancel.clone()) {
        warn!(error = %e, "Ctrl-C will not cancel the lock wait");
    }

    let stdout = io::stdout();
    let stderr = io::stderr();
    run_state_lock(
        &ctx,
        &args,
        &cancel,
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

/// Run the command against an already-resolved context.
pub(crate) fn run_state_lock(
    ctx: &StateContext,
    args: &StateLockArgs,
    cancel: &CancelSignal,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let config = Config::load_or_default(ctx.config_path())?;
    let timeout = args.lock_timeout.unwrap_or(config.lock_timeout);

    let target = ctx.resolve_target(&config, args.state.as_deref())?;
    info!(
        state = %target,
        locking = target.supports_locking(),
        workspace = %ctx.workspace,
        timeout = %humantime::format_duration(timeout),
        "locking state"
    );

    let request = LockRequest::new(target, STATE_LOCK_OPERATION);

    // The notice is printed while the wait is still going on, so it borrows `err`
    let notice_out = RefCell::new(err);
    let outcome = {
        let coordinator = LockCoordinator::new(config.retry_policy()).with_wait_notice(|_| {
            let mut err = notice_out.borrow_mut();
            let _ = writeln!(err, "Acquiring state lock. This may take a few moments...");
        });
        coordinator.acquire(&request, timeout, cancel)
    };
    debug!(
        success = outcome.is_success(),
        lock_id = outcome.lock_id(),
        "state lock attempt finished"
    );

    report::report_outcome(outcome, &request, timeout, out, notice_out.into_inner())
}

//! Translate a user interrupt (Ctrl-C) into a [`CancelSignal`].

use crate::error::{Result, StateLockError};
use crate::exit_codes;
use crate::locks::CancelSignal;
use std::thread;
use tracing::{debug, warn};

/// Raise `signal` when the process receives Ctrl-C.
///
/// The listener runs on a detached thread with its own single-threaded
/// runtime. The first interrupt raises the signal; a second one exits the
/// process immediately, for when a backend call itself hangs.
pub fn cancel_on_interrupt(signal: CancelSignal) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            StateLockError::UserError(format!("failed to set up interrupt handling: {}", e))
        })?;

    thread::Builder::new()
        .name("statelock-interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for interrupts");
                    return;
                }
                debug!("interrupt received, cancelling lock wait");
                signal.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Interrupted again, exiting.");
                    std::process::exit(exit_codes::CANCELLED);
                }
            });
        })
        .map_err(|e| {
            StateLockError::UserError(format!("failed to spawn interrupt listener: {}", e))
        })?;

    Ok(())
}

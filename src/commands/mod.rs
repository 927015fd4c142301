//! Command implementations for statelock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod state_lock;

use crate::cli::{Command, StateAction, StateCommand};
use crate::error::Result;

pub use state_lock::cmd_state_lock;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::State(state_cmd) => dispatch_state(state_cmd),
    }
}

/// Dispatch state subcommands.
fn dispatch_state(state_cmd: StateCommand) -> Result<()> {
    match state_cmd.action {
        StateAction::Lock(args) => cmd_state_lock(args),
    }
}

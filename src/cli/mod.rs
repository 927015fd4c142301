//! CLI argument parsing for statelock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// statelock: advisory locking for shared infrastructure state.
///
/// A lock marks the state of the current workspace as being changed, so
/// other processes using the same backend refuse to start mutating it.
#[derive(Parser, Debug)]
#[command(name = "statelock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase diagnostic output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for statelock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// State management commands.
    State(StateCommand),
}

/// The `state` command group.
#[derive(Parser, Debug)]
pub struct StateCommand {
    #[command(subcommand)]
    pub action: StateAction,
}

/// Available state actions.
#[derive(Subcommand, Debug)]
pub enum StateAction {
    /// Acquire a lock on the state of the current workspace.
    ///
    /// This will not modify any infrastructure. The behavior of the lock
    /// depends on the configured backend. Local state files cannot be locked.
    Lock(StateLockArgs),
}

/// Arguments for the `state lock` command.
#[derive(Parser, Debug)]
pub struct StateLockArgs {
    /// Configuration directory (default: current directory).
    pub dir: Option<PathBuf>,

    /// How long to retry while the lock is held elsewhere (e.g. 30s, 5m).
    /// Overrides `lock_timeout` from the config; 0s tries once.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub lock_timeout: Option<Duration>,

    /// Path to the local state file, overriding the configured backend path.
    #[arg(long, value_name = "PATH")]
    pub state: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

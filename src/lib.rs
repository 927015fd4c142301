//! statelock: advisory locking for shared infrastructure state.
//!
//! The [`locks`] module holds the lock protocol itself; the remaining modules
//! are the thin CLI around it (argument parsing, configuration, workspace
//! resolution, output).

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod interrupt;
pub mod locks;
pub mod logging;

#[cfg(test)]
mod test_support;

//! statelock: advisory locking for shared infrastructure state.
//!
//! This is the main entry point for the `statelock` CLI. It parses arguments,
//! sets up diagnostic logging, dispatches to the appropriate command handler,
//! and handles errors with proper exit codes.

use statelock::cli::Cli;
use statelock::{commands, exit_codes, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

//! Entry point for the `walletd` binary.
//!
//! Delegates to [`walletd_cli::run`]. The standard streams are passed
//! unlocked because service threads log to stderr for the whole run.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    walletd_cli::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}

//! Command-line interface definition for `walletd`.

use clap::{Args, Parser, Subcommand};

/// Wallet service runner.
#[derive(Parser, Debug)]
#[command(name = "walletd", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Wallet service commands.
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ServiceAction {
    /// Runs the wallet service until interrupted.
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunArgs {
    /// Starts the console proxy and opens it in the default browser.
    #[arg(short = 'p', long = "console-proxy", conflicts_with = "console_ui")]
    pub(crate) console_proxy: bool,
    /// Starts the console proxy and shows it in a native window.
    #[arg(short = 'u', long = "console-ui")]
    pub(crate) console_ui: bool,
}

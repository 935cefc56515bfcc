//! Command-line runtime for the wallet service runner.
//!
//! Parses `walletd [config flags] service run [-p | -u]`, loads the layered
//! configuration and hands over to [`walletd::run_service`]. Only failures
//! before startup produce a non-zero exit status; once the services are up,
//! every outcome is logged and the process exits successfully.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use walletd::{LaunchError, NATIVE_VIEW_AVAILABLE, RunOptions, ShutdownReport};
use walletd_config::Config;

mod cli;
mod config;
mod errors;

use cli::{Cli, CliCommand, RunArgs, ServiceAction};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
pub(crate) use errors::AppError;

/// Starts a run once arguments and configuration are settled.
pub(crate) trait ServiceLauncher {
    fn launch(&self, config: &Config, options: RunOptions) -> Result<ShutdownReport, LaunchError>;
}

struct SystemLauncher;

impl ServiceLauncher for SystemLauncher {
    fn launch(&self, config: &Config, options: RunOptions) -> Result<ShutdownReport, LaunchError> {
        walletd::run_service(config, options)
    }
}

/// Runs the CLI with the given arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &OrthoConfigLoader, &SystemLauncher)
}

fn run_with<I, W, E, L, S>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    launcher: &S,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    S: ServiceLauncher,
{
    let args = args.into_iter().collect::<Vec<_>>();
    let split = split_config_arguments(&args);

    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error)
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            return match write!(stdout, "{}", error.render()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    let result = match cli.command {
        CliCommand::Service {
            action: ServiceAction::Run(run_args),
        } => run_service(run_args, &split.config_arguments, loader, launcher),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error),
    }
}

fn run_service<L, S>(
    run_args: RunArgs,
    config_arguments: &[OsString],
    loader: &L,
    launcher: &S,
) -> Result<(), AppError>
where
    L: ConfigLoader,
    S: ServiceLauncher,
{
    if run_args.console_ui && !NATIVE_VIEW_AVAILABLE {
        return Err(AppError::NativeViewUnavailable);
    }
    let config = loader.load(config_arguments)?;
    let options = RunOptions::from_flags(run_args.console_proxy, run_args.console_ui);
    launcher.launch(&config, options)?;
    Ok(())
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    let _ = writeln!(stderr, "walletd: {error}");
    ExitCode::FAILURE
}

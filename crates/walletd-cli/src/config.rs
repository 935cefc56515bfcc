//! Splits configuration flags from the command tokens.
//!
//! Configuration flags must precede the subcommand. They are handed to
//! `ortho_config`, while the remaining tokens go to the `clap` parser.

use std::ffi::{OsStr, OsString};

use walletd_config::Config;

use crate::AppError;

/// Flags understood by the configuration loader.
///
/// Keep in sync with the fields of [`walletd_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--service-host",
    "--service-port",
    "--console-port",
    "--console-url",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the split-off configuration arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        use ortho_config::OrthoConfig;

        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments after splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// Program name followed by the configuration flags.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by the command tokens.
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut remaining = args.iter();
    let program = remaining.next().cloned();
    let mut config_arguments = program.iter().cloned().collect::<Vec<_>>();
    let mut command_arguments = config_arguments.clone();

    let mut tokens = remaining.peekable();
    while let Some(argument) = tokens.peek() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push((*argument).clone());
                tokens.next();
                if needs_value && let Some(value) = tokens.next() {
                    config_arguments.push(value.clone());
                }
            }
            FlagAction::Stop => break,
        }
    }
    command_arguments.extend(tokens.cloned());

    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

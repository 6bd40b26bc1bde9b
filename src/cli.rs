// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `runwaiter`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runwaiter",
    version,
    about = "Trigger and track configuration-management client runs on this host.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file means built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNWAITER_LOG` or the config `debug` flag decides.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print it, and exit.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_the_loader_path() {
        let args = CliArgs::try_parse_from(["runwaiter"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert!(!args.dry_run);
    }

    #[test]
    fn config_flag_overrides_default() {
        let args =
            CliArgs::try_parse_from(["runwaiter", "--config", "/etc/runwaiter.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/runwaiter.toml"));
    }
}

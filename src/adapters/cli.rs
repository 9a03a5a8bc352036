//! Command-line interface
//!
//! Argument parsing with clap derive macros. Command wiring lives in the
//! binary entry point.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paper trading simulator for momentum and mean reversion strategies
#[derive(Parser, Debug)]
#[command(
    name = "papertrader",
    version = env!("CARGO_PKG_VERSION"),
    about = "Paper trading simulator for momentum and mean reversion strategies"
)]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the simulation loop
    Run(RunCmd),

    /// Validate a configuration file and exit
    Validate(ValidateCmd),
}

/// Start the simulation loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/papertrader.toml")]
    pub config: PathBuf,

    /// Stop after this many ticks instead of running until interrupted
    #[arg(long, value_name = "N")]
    pub ticks: Option<u64>,
}

/// Validate a configuration file
#[derive(Parser, Debug)]
pub struct ValidateCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/papertrader.toml")]
    pub config: PathBuf,
}

/// Parse command-line arguments
pub fn init() -> CliApp {
    CliApp::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let app = CliApp::try_parse_from(["papertrader", "run"]).unwrap();
        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("config/papertrader.toml"));
                assert!(cmd.ticks.is_none());
            }
            _ => panic!("expected run command"),
        }
        assert!(!app.verbose);
    }

    #[test]
    fn test_run_with_overrides() {
        let app = CliApp::try_parse_from([
            "papertrader",
            "run",
            "--config",
            "custom.toml",
            "--ticks",
            "10",
            "--verbose",
        ])
        .unwrap();
        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("custom.toml"));
                assert_eq!(cmd.ticks, Some(10));
            }
            _ => panic!("expected run command"),
        }
        assert!(app.verbose);
    }

    #[test]
    fn test_validate_command() {
        let app = CliApp::try_parse_from(["papertrader", "validate", "-c", "x.toml"]).unwrap();
        assert!(matches!(app.command, Command::Validate(_)));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(CliApp::try_parse_from(["papertrader", "explode"]).is_err());
    }
}

// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `penwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "penwatch",
    version,
    about = "Run prep commands and restart daemons when files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(short = 'f', long, value_name = "PATH", default_value = "penwatch.toml")]
    pub file: PathBuf,

    /// Don't watch our own config file.
    #[arg(short = 'c', long)]
    pub noconf: bool,

    /// Ring the terminal bell if any command returns an error.
    #[arg(short = 'b', long)]
    pub bell: bool,

    /// List default ignore patterns and exit.
    #[arg(short = 'i', long)]
    pub ignores: bool,

    /// Run prep commands once and exit.
    #[arg(short = 'p', long)]
    pub prep: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PENWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
    fn short_flags_parse() {
        let args = CliArgs::try_parse_from(["penwatch", "-f", "x.toml", "-c", "-b", "-p"]).unwrap();
        assert_eq!(args.file, PathBuf::from("x.toml"));
        assert!(args.noconf && args.bell && args.prep);
        assert!(!args.ignores);
    }

    #[test]
    fn file_defaults_to_penwatch_toml() {
        let args = CliArgs::try_parse_from(["penwatch"]).unwrap();
        assert_eq!(args.file, PathBuf::from("penwatch.toml"));
        assert!(args.log_level.is_none());
    }
}

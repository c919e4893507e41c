// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `xcproc`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "xcproc",
    version,
    about = "Run an external tool with concurrent output draining and Ctrl-C cancellation.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Xcproc.toml` is used when it exists; otherwise defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How to run the program and report its result.
    #[arg(long, value_enum, default_value_t = RunMode::Raw)]
    pub mode: RunMode,

    /// Working directory for the program.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variable for the program (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `XCPROC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Program to run.
    #[arg(value_name = "PROGRAM", required = true)]
    pub program: String,

    /// Arguments passed to the program.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Which run shape to use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Stream output live and exit with the program's exit code.
    Raw,
    /// Print trimmed stdout; fail with the program's diagnostic on nonzero exit.
    Strict,
    /// Print trimmed stdout, or exit 1 silently on any failure.
    Try,
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

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

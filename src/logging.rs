// src/logging.rs

//! Logging setup for the `xcproc` binary using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `XCPROC_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout carries only the child's output.
//! The library itself never installs a subscriber; it emits events inside
//! each `ProcessRunner`'s span.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = resolve_level(cli_level, std::env::var("XCPROC_LOG").ok().as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Pick the effective level from the CLI flag and the env var value.
///
/// The env value accepts any name `tracing` understands (case-insensitive,
/// or `1` for error through `5` for trace) plus `warning`. Anything else
/// falls back to info.
pub fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Level {
    cli_level
        .map(Level::from)
        .or_else(|| env_value.and_then(env_level))
        .unwrap_or(Level::INFO)
}

fn env_level(value: &str) -> Option<Level> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("warning") {
        return Some(Level::WARN);
    }
    value.parse().ok()
}

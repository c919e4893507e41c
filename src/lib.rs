// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;

use std::io;

use anyhow::Result;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::info;

use crate::cli::{CliArgs, RunMode};
use crate::config::load_or_default;
use crate::errors::{ExecError, LaunchFailure};
use crate::exec::{CancellationToken, Invocation, OutputSink, ProcessRunner, WriterSink};

/// Exit code reported when the run was cancelled (as for SIGINT).
pub const EXIT_CANCELLED: i32 = 130;
/// Exit code reported when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported for any other launch failure.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

/// High-level entry point used by `main.rs`.
///
/// Loads config, builds the invocation, arms Ctrl-C cancellation and runs
/// the program in the requested mode. Returns the exit code the binary
/// should terminate with.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = load_or_default(args.config.as_deref())?;
    let runner = ProcessRunner::new(config);
    let invocation = build_invocation(&args);

    let cancel = CancellationToken::new();
    let _ctrl_c = CtrlCListener::spawn(cancel.clone());

    let code = match args.mode {
        RunMode::Raw => {
            let stdout = WriterSink::new(io::stdout())?;
            let stderr = WriterSink::new(io::stderr())?;
            let stdout_sink: &dyn OutputSink = &stdout;
            let stderr_sink: &dyn OutputSink = &stderr;
            let result = runner
                .start_process(&invocation, Some(stdout_sink), Some(stderr_sink), Some(&cancel))
                .await;

            // Flush everything forwarded so far before reporting.
            tokio::task::spawn_blocking(move || -> io::Result<()> {
                stdout.finish()?;
                stderr.finish()?;
                Ok(())
            })
            .await??;

            match result {
                Ok(outcome) => normalize_exit_code(outcome.code),
                Err(e) => exit_code_for_error(e)?,
            }
        }
        RunMode::Strict => match runner.run_invocation_strict(&invocation, Some(&cancel)).await {
            Ok(stdout) => {
                println!("{stdout}");
                0
            }
            Err(e) => exit_code_for_error(e)?,
        },
        RunMode::Try => match runner.try_run_invocation(&invocation, Some(&cancel)).await {
            Ok(Some(stdout)) => {
                println!("{stdout}");
                0
            }
            Ok(None) => 1,
            Err(e) => exit_code_for_error(e)?,
        },
    };

    Ok(code)
}

/// Background task that cancels `token` on Ctrl-C.
///
/// The task is aborted when the listener is dropped, so a finished run
/// leaves nothing waiting on SIGINT.
#[derive(Debug)]
pub struct CtrlCListener {
    handle: JoinHandle<()>,
}

impl CtrlCListener {
    pub fn spawn(token: CancellationToken) -> Self {
        let handle = tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; cancelling run");
            token.cancel();
        });
        Self { handle }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }
}

impl Drop for CtrlCListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Turn CLI arguments into an [`Invocation`].
pub fn build_invocation(args: &CliArgs) -> Invocation {
    let mut invocation = Invocation::new(&args.program).args(&args.args);
    if let Some(cwd) = &args.cwd {
        invocation = invocation.current_dir(cwd);
    }
    for (key, value) in &args.env {
        invocation = invocation.env(key, value);
    }
    invocation
}

/// Map an engine error to a shell-style exit code, printing its message.
///
/// Errors outside the run taxonomy (config, IO) are passed back up.
pub fn exit_code_for_error(err: ExecError) -> Result<i32> {
    match err {
        ExecError::Cancelled { .. } => {
            eprintln!("{err}");
            Ok(EXIT_CANCELLED)
        }
        ExecError::Launch { kind, .. } => {
            eprintln!("{err}");
            Ok(if kind == LaunchFailure::NotFound {
                EXIT_NOT_FOUND
            } else {
                EXIT_CANNOT_EXECUTE
            })
        }
        ExecError::ProcessFailed { code, .. } => {
            eprintln!("{err}");
            Ok(normalize_exit_code(code))
        }
        other => Err(other.into()),
    }
}

/// Clamp a child exit code into the range a process can exit with.
pub fn normalize_exit_code(code: i32) -> i32 {
    if (0..=255).contains(&code) { code } else { 1 }
}

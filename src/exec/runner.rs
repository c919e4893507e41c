// src/exec/runner.rs

//! Execution facade.
//!
//! Every public run shape goes through one private `execute` step:
//!
//! 1. fail fast with `Cancelled` if the token is already cancelled;
//! 2. launch (may fail with `Launch`);
//! 3. arm the cancellation controller;
//! 4. drive the stdout pump, the stderr pump and the exit wait concurrently
//!    and join all three;
//! 5. report `Cancelled` if cancellation was requested at any point up to
//!    the join, whatever the exit code was;
//! 6. otherwise return the exit outcome.

use std::ffi::OsStr;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::config::ExecConfig;
use crate::errors::{ExecError, Result};
use crate::exec::cancel::CancellationController;
use crate::exec::exit::{self, ExitLatch, ExitOutcome};
use crate::exec::invocation::Invocation;
use crate::exec::pump::{self, CaptureSink, NullSink, OutputSink, PumpReport};
use crate::exec::spawn;

/// How long the pumps may keep draining after a cancellation kill.
///
/// A grandchild that inherited the pipes can hold them open after the direct
/// child is dead; past this point the drain is abandoned.
pub const CANCEL_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Exit code and captured output of a raw run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best diagnostic for a failed run: trimmed stderr, then trimmed
    /// stdout, then a synthesized message.
    pub fn failure_message(&self, program: &str) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("{} returned exit code {}", program, self.exit_code)
    }

    pub fn into_failure(self, program: &str) -> ExecError {
        ExecError::ProcessFailed {
            program: program.to_string(),
            code: self.exit_code,
            message: self.failure_message(program),
        }
    }
}

/// Runs external programs, one child process per call.
///
/// Holds no per-run state, so one runner can serve any number of concurrent
/// calls. All log events are emitted inside `span`, which callers can
/// replace with [`ProcessRunner::with_span`].
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    config: ExecConfig,
    span: Span,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(ExecConfig::default())
    }
}

impl ProcessRunner {
    pub fn new(config: ExecConfig) -> Self {
        let span = info_span!("process_runner", runner = %config.runner.label);
        Self { config, span }
    }

    /// Emit this runner's events under `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Low-level run: stream output into caller-supplied sinks.
    ///
    /// A missing sink means the stream is drained and discarded. Returns the
    /// exit outcome for any exit code; only launch failures and cancellation
    /// are errors.
    pub async fn start_process(
        &self,
        invocation: &Invocation,
        stdout: Option<&dyn OutputSink>,
        stderr: Option<&dyn OutputSink>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ExitOutcome> {
        let invocation = invocation.clone().with_defaults(&self.config);
        self.execute(
            &invocation,
            stdout.unwrap_or(&NullSink),
            stderr.unwrap_or(&NullSink),
            cancel,
        )
        .instrument(self.span.clone())
        .await
    }

    /// Raw run of `program` with `args`.
    ///
    /// Never fails because of a nonzero exit code.
    pub async fn run<P, I, S>(
        &self,
        program: P,
        args: I,
        cancel: Option<&CancellationToken>,
    ) -> Result<RunOutput>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let invocation = Invocation::new(program).args(args);
        self.run_invocation(&invocation, cancel).await
    }

    /// Raw run of a fully specified invocation.
    pub async fn run_invocation(
        &self,
        invocation: &Invocation,
        cancel: Option<&CancellationToken>,
    ) -> Result<RunOutput> {
        let invocation = invocation.clone().with_defaults(&self.config);

        let stdout = CaptureSink::new();
        let stderr = CaptureSink::new();
        let stdout_sink: &dyn OutputSink = if invocation.captures_stdout() {
            &stdout
        } else {
            &NullSink
        };
        let stderr_sink: &dyn OutputSink = if invocation.captures_stderr() {
            &stderr
        } else {
            &NullSink
        };

        let outcome = self
            .execute(&invocation, stdout_sink, stderr_sink, cancel)
            .instrument(self.span.clone())
            .await?;

        Ok(RunOutput {
            exit_code: outcome.code,
            stdout: stdout.to_string_lossy(),
            stderr: stderr.to_string_lossy(),
        })
    }

    /// Strict run: trimmed stdout, or `ProcessFailed` on a nonzero exit.
    pub async fn run_strict<P, I, S>(
        &self,
        program: P,
        args: I,
        cancel: Option<&CancellationToken>,
    ) -> Result<String>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let invocation = Invocation::new(program).args(args);
        self.run_invocation_strict(&invocation, cancel).await
    }

    pub async fn run_invocation_strict(
        &self,
        invocation: &Invocation,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        let output = self.run_invocation(invocation, cancel).await?;
        if !output.success() {
            let program = invocation.display_program();
            self.span.in_scope(|| {
                debug!(program = %program, exit_code = output.exit_code, "strict run failed")
            });
            return Err(output.into_failure(&program));
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Best-effort run: trimmed stdout on exit code 0, `None` on a nonzero
    /// exit or launch failure. Cancellation is still returned as an error.
    pub async fn try_run<P, I, S>(
        &self,
        program: P,
        args: I,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<String>>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let invocation = Invocation::new(program).args(args);
        self.try_run_invocation(&invocation, cancel).await
    }

    pub async fn try_run_invocation(
        &self,
        invocation: &Invocation,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<String>> {
        match self.run_invocation(invocation, cancel).await {
            Ok(output) if output.success() => Ok(Some(output.stdout.trim().to_string())),
            Ok(output) => {
                self.span.in_scope(|| {
                    debug!(
                        program = %invocation.display_program(),
                        exit_code = output.exit_code,
                        "best-effort run exited nonzero"
                    )
                });
                Ok(None)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.span
                    .in_scope(|| debug!(error = %e, "best-effort run failed"));
                Ok(None)
            }
        }
    }

    /// Blocking raw run for callers outside any async runtime.
    ///
    /// Drives the same pumps and exit wait on a private current-thread
    /// runtime. Calling this from inside a runtime would block one of its
    /// workers, so that is refused with `BlockingInAsyncContext`.
    pub fn run_blocking(
        &self,
        invocation: &Invocation,
        cancel: Option<&CancellationToken>,
    ) -> Result<RunOutput> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ExecError::BlockingInAsyncContext);
        }

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        rt.block_on(self.run_invocation(invocation, cancel))
    }

    async fn execute(
        &self,
        invocation: &Invocation,
        stdout: &dyn OutputSink,
        stderr: &dyn OutputSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<ExitOutcome> {
        let program = invocation.display_program();

        if cancel.is_some_and(|t| t.is_cancelled()) {
            debug!(program = %program, "cancelled before launch");
            return Err(ExecError::cancelled(program));
        }

        info!(
            program = %program,
            args = ?invocation.get_args(),
            "starting process"
        );

        let mut process = spawn::launch(invocation)?;
        let pid = process.pid();
        let controller = CancellationController::arm(cancel);
        let latch = ExitLatch::new();

        let stdout_pipe = process.stdout.take();
        let stderr_pipe = process.stderr.take();
        let buffer_size = self.config.buffer_size();

        let (stdout_report, stderr_report, outcome) = tokio::join!(
            drain(stdout_pipe, stdout, buffer_size, &controller, "stdout"),
            drain(stderr_pipe, stderr, buffer_size, &controller, "stderr"),
            exit::await_exit(&mut process.child, &latch, &controller),
        );

        if controller.is_requested() {
            info!(
                program = %program,
                pid = ?pid,
                exit_code = outcome.code,
                "process run cancelled"
            );
            return Err(ExecError::cancelled(program));
        }

        info!(
            program = %program,
            pid = ?pid,
            exit_code = outcome.code,
            completed = outcome.completed,
            stdout_bytes = stdout_report.bytes,
            stderr_bytes = stderr_report.bytes,
            "process exited"
        );

        Ok(outcome)
    }
}

/// Pump one pipe to completion, bounding the wait once cancellation fires.
async fn drain<R>(
    pipe: Option<R>,
    sink: &dyn OutputSink,
    buffer_size: usize,
    controller: &CancellationController,
    stream: &'static str,
) -> PumpReport
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return PumpReport {
            bytes: 0,
            error: None,
        };
    };

    let pumping = pump::pump(pipe, sink, buffer_size);
    tokio::pin!(pumping);

    tokio::select! {
        report = &mut pumping => report,
        _ = controller.requested() => {
            match tokio::time::timeout(CANCEL_DRAIN_GRACE, &mut pumping).await {
                Ok(report) => report,
                Err(_) => {
                    warn!(stream, "pipe still open after cancellation; abandoning drain");
                    PumpReport {
                        bytes: 0,
                        error: Some(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "drain abandoned after cancellation",
                        )),
                    }
                }
            }
        }
    }
}

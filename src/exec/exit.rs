// src/exec/exit.rs

//! Exit synchronizer.
//!
//! A fast child (think `/bin/true`) can be gone before anyone starts waiting
//! for it. [`await_exit`] therefore polls once right after spawn and only
//! then waits on the OS; both paths resolve the same [`ExitLatch`], which
//! accepts a value at most once.

use std::process::ExitStatus;
use std::sync::OnceLock;

use tokio::process::Child;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::exec::cancel::CancellationController;

/// Authoritative termination result of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, or `128 + signal` when the process was killed by a signal.
    pub code: i32,
    /// `true` if the process exited on its own rather than by a signal.
    pub completed: bool,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.completed && self.code == 0
    }

    /// Outcome used when waiting on the child itself failed.
    pub fn unknown() -> Self {
        Self {
            code: -1,
            completed: false,
        }
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self {
                code,
                completed: true,
            },
            None => Self {
                code: signal_code(&status),
                completed: false,
            },
        }
    }
}

#[cfg(unix)]
fn signal_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| 128 + sig).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_code(_status: &ExitStatus) -> i32 {
    -1
}

/// Single-assignment, awaitable slot for an [`ExitOutcome`].
#[derive(Debug, Default)]
pub struct ExitLatch {
    slot: OnceLock<ExitOutcome>,
    notify: Notify,
}

impl ExitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `outcome` if nothing has been stored yet.
    ///
    /// Returns `true` for the call that won.
    pub fn resolve(&self, outcome: ExitOutcome) -> bool {
        let won = self.slot.set(outcome).is_ok();
        if won {
            self.notify.notify_waiters();
        }
        won
    }

    pub fn get(&self) -> Option<ExitOutcome> {
        self.slot.get().copied()
    }

    /// Wait until an outcome has been stored.
    pub async fn wait(&self) -> ExitOutcome {
        loop {
            // Register before checking so a resolve in between isn't lost.
            let notified = self.notify.notified();
            if let Some(outcome) = self.get() {
                return outcome;
            }
            notified.await;
        }
    }
}

/// Wait for `child` to terminate and resolve `latch` with the result.
///
/// If the controller fires first the child is killed and then reaped, so the
/// latch is always resolved before this returns.
pub async fn await_exit(
    child: &mut Child,
    latch: &ExitLatch,
    cancel: &CancellationController,
) -> ExitOutcome {
    // Fast path: already exited before we got here.
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(exit_status = %status, "process had already exited");
            latch.resolve(status.into());
            return latch.wait().await;
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "try_wait failed; falling back to wait"),
    }

    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel.requested() => {
            cancel.terminate(child);
            child.wait().await
        }
    };

    let outcome = match status {
        Ok(status) => ExitOutcome::from(status),
        Err(e) => {
            warn!(error = %e, "waiting for process failed");
            ExitOutcome::unknown()
        }
    };

    latch.resolve(outcome);
    latch.wait().await
}

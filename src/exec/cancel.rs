// src/exec/cancel.rs

//! Cancellation controller: kill-on-cancel for a single child process.

use std::io;

use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Watches the caller's cancellation token for the lifetime of one run.
///
/// Arming derives a child token, so nothing the controller does can cancel
/// the caller's token or its siblings. Without a caller token the controller
/// never fires.
#[derive(Debug, Clone)]
pub struct CancellationController {
    token: CancellationToken,
}

impl CancellationController {
    pub fn arm(parent: Option<&CancellationToken>) -> Self {
        let token = match parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        Self { token }
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await
    }

    /// Forcibly kill `child`.
    ///
    /// A child that has already exited is not an error. Returns `true` if a
    /// kill signal was actually delivered.
    pub fn terminate(&self, child: &mut Child) -> bool {
        // tokio clears the pid once the child has been reaped, and
        // `start_kill` on a reaped child reports success without signalling.
        let pid = child.id();
        let exited = pid.is_none() || matches!(child.try_wait(), Ok(Some(_)));
        if exited {
            debug!(pid = ?pid, "cancellation requested but process had already exited");
            return false;
        }

        match child.start_kill() {
            Ok(()) => {
                info!(pid = ?pid, "cancellation requested; killed process");
                true
            }
            Err(e) if is_already_exited(&e) => {
                debug!(pid = ?pid, "cancellation requested but process had already exited");
                false
            }
            Err(e) => {
                warn!(pid = ?pid, error = %e, "failed to kill process on cancellation");
                false
            }
        }
    }
}

/// Older tokio reports a reaped child as `InvalidInput`; a child that died
/// between the check and the signal yields `ESRCH`.
fn is_already_exited(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::InvalidInput {
        return true;
    }
    #[cfg(unix)]
    {
        const ESRCH: i32 = 3;
        if err.raw_os_error() == Some(ESRCH) {
            return true;
        }
    }
    false
}

// src/exec/spawn.rs

//! Process spawner: turns an [`Invocation`] into a running child.

use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

use crate::errors::{ExecError, Result};
use crate::exec::invocation::Invocation;

/// A started child process plus the read ends of its output pipes.
///
/// Both pipes are always present right after [`launch`]; callers `take()`
/// them to hand to the stream pumps. The child is spawned with
/// `kill_on_drop(true)`, so dropping this handle on any error path kills the
/// process and closes its pipes.
#[derive(Debug)]
pub struct RunningProcess {
    pub child: Child,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
    pid: Option<u32>,
    program: String,
}

impl RunningProcess {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Start the process described by `invocation`.
///
/// stdin is connected to `/dev/null`; stdout and stderr are always piped,
/// even when the caller doesn't capture them, so the pumps can drain them.
pub fn launch(invocation: &Invocation) -> Result<RunningProcess> {
    let program = invocation.display_program();

    let mut cmd = Command::new(invocation.program());
    cmd.args(invocation.get_args())
        .envs(invocation.env_overrides())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = invocation.working_dir() {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| {
        warn!(program = %program, error = %e, "failed to launch process");
        ExecError::launch(program.clone(), e)
    })?;

    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    if stdout.is_none() || stderr.is_none() {
        // Dropping `child` kills it (kill_on_drop) and closes whatever pipe
        // we did get.
        return Err(ExecError::launch(
            program,
            std::io::Error::other("child output pipes were not created"),
        ));
    }

    debug!(
        program = %program,
        pid = ?pid,
        args = ?invocation.get_args(),
        cwd = ?invocation.working_dir(),
        "process launched"
    );

    Ok(RunningProcess {
        child,
        stdout,
        stderr,
        pid,
        program,
    })
}

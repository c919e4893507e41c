// src/errors.rs

//! Crate-wide error type and helpers.

use std::io;

use thiserror::Error;

/// Why the OS refused to start a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchFailure {
    /// The executable does not exist (or a path component is missing).
    NotFound,
    /// The file exists but is not executable, or access was denied.
    PermissionDenied,
    /// The argument list plus environment exceeded the OS limit.
    ArgumentListTooLong,
    /// The OS is out of processes, memory or file descriptors.
    ResourceExhausted,
    Other,
}

impl LaunchFailure {
    /// Classify the error returned by the spawn call.
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => LaunchFailure::NotFound,
            io::ErrorKind::PermissionDenied => LaunchFailure::PermissionDenied,
            io::ErrorKind::ArgumentListTooLong => LaunchFailure::ArgumentListTooLong,
            io::ErrorKind::OutOfMemory | io::ErrorKind::WouldBlock => {
                LaunchFailure::ResourceExhausted
            }
            _ => LaunchFailure::Other,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to launch '{program}' ({kind:?}): {source}")]
    Launch {
        program: String,
        kind: LaunchFailure,
        #[source]
        source: io::Error,
    },

    /// The process ran to completion with a nonzero exit code.
    ///
    /// Only produced by the strict run variant.
    #[error("{message}")]
    ProcessFailed {
        program: String,
        code: i32,
        message: String,
    },

    #[error("execution of '{program}' was cancelled")]
    Cancelled { program: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("blocking run requested from inside an async runtime")]
    BlockingInAsyncContext,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecError {
    pub fn launch(program: impl Into<String>, source: io::Error) -> Self {
        ExecError::Launch {
            program: program.into(),
            kind: LaunchFailure::classify(&source),
            source,
        }
    }

    pub fn cancelled(program: impl Into<String>) -> Self {
        ExecError::Cancelled {
            program: program.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled { .. })
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, ExecError::Launch { .. })
    }

    /// Exit code carried by a `ProcessFailed` error.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::ProcessFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;

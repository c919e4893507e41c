// src/exec/invocation.rs

//! A single request to run an external program.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::config::ExecConfig;

/// Everything needed to start one child process.
///
/// Built with consuming builder methods and not mutated afterwards; the
/// spawner only ever borrows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<OsString, OsString>,
    capture_stdout: bool,
    capture_stderr: bool,
}

impl Invocation {
    /// New invocation of `program` with no arguments, capturing both streams.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            capture_stdout: true,
            capture_stderr: true,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .insert(key.as_ref().to_os_string(), value.as_ref().to_os_string());
        self
    }

    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Fill in the working directory and environment from `config` where
    /// this invocation doesn't already set them.
    pub fn with_defaults(mut self, config: &ExecConfig) -> Self {
        if self.working_dir.is_none() {
            self.working_dir = config.runner.working_dir.clone();
        }
        for (key, value) in &config.env {
            self.env
                .entry(OsString::from(key))
                .or_insert_with(|| OsString::from(value));
        }
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Program name for messages and log fields.
    pub fn display_program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn env_overrides(&self) -> &BTreeMap<OsString, OsString> {
        &self.env
    }

    pub fn captures_stdout(&self) -> bool {
        self.capture_stdout
    }

    pub fn captures_stderr(&self) -> bool {
        self.capture_stderr
    }
}

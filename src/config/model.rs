// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::pump::DEFAULT_BUFFER_SIZE;

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [runner]
/// buffer_size = 4096
/// working_dir = "/tmp"
/// label = "xcode"
///
/// [env]
/// DEVELOPER_DIR = "/Applications/Xcode.app/Contents/Developer"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExecConfig {
    #[serde(default)]
    pub runner: RunnerSection,

    /// Environment overrides applied to every invocation.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Chunk size used by the stream pumps, in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Working directory for invocations that don't set one.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Label attached to the runner's tracing span.
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_label() -> String {
    "xcproc".to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            working_dir: None,
            label: default_label(),
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawExecConfig>` (see [`super::validate`])
/// or `Default`.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    pub runner: RunnerSection,
    pub env: BTreeMap<String, String>,
}

impl ExecConfig {
    pub(crate) fn new_unchecked(runner: RunnerSection, env: BTreeMap<String, String>) -> Self {
        Self { runner, env }
    }

    pub fn buffer_size(&self) -> usize {
        self.runner.buffer_size
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self::new_unchecked(RunnerSection::default(), BTreeMap::new())
    }
}

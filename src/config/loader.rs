// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ExecConfig, RawExecConfig};
use crate::errors::Result;

/// Load a configuration file and return the raw `RawExecConfig`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// the checked version.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawExecConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawExecConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// Checks that the pump buffer size is non-zero, that the default working
/// directory (if any) exists, and that `[env]` keys are valid variable names.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ExecConfig> {
    let raw = load_from_path(&path)?;
    ExecConfig::try_from(raw)
}

/// `Xcproc.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Xcproc.toml")
}

/// Load `path` if given; otherwise load the default config file when it
/// exists, falling back to built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<ExecConfig> {
    match path {
        Some(path) => load_and_validate(path),
        None => {
            let default_path = default_config_path();
            if default_path.is_file() {
                load_and_validate(default_path)
            } else {
                Ok(ExecConfig::default())
            }
        }
    }
}

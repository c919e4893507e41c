// src/config/validate.rs

use crate::config::model::{ExecConfig, RawExecConfig};
use crate::errors::{ExecError, Result};

impl TryFrom<RawExecConfig> for ExecConfig {
    type Error = ExecError;

    fn try_from(raw: RawExecConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ExecConfig::new_unchecked(raw.runner, raw.env))
    }
}

fn validate_raw_config(cfg: &RawExecConfig) -> Result<()> {
    validate_runner(cfg)?;
    validate_env(cfg)?;
    Ok(())
}

fn validate_runner(cfg: &RawExecConfig) -> Result<()> {
    if cfg.runner.buffer_size == 0 {
        return Err(ExecError::Config(
            "[runner].buffer_size must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(dir) = &cfg.runner.working_dir {
        if !dir.is_dir() {
            return Err(ExecError::Config(format!(
                "[runner].working_dir {:?} is not an existing directory",
                dir
            )));
        }
    }

    Ok(())
}

fn validate_env(cfg: &RawExecConfig) -> Result<()> {
    for key in cfg.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(ExecError::Config(format!(
                "[env] has invalid variable name '{}'",
                key
            )));
        }
    }
    Ok(())
}

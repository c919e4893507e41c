// src/config/mod.rs

//! Runner configuration loaded from TOML.
//!
//! - [`model`] holds the raw (as-parsed) and validated config types.
//! - [`loader`] reads files from disk.
//! - [`validate`] turns a `RawExecConfig` into an `ExecConfig`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ExecConfig, RawExecConfig, RunnerSection};

// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a pipeline file and return the raw, unvalidated `RawConfigFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// graph checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a pipeline file and validate it:
///
/// - at least one task,
/// - sane `[queue]` limits and task timeouts,
/// - known, non-self `after` references,
/// - no cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// `Opflow.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Opflow.toml")
}

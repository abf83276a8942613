// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{Config, RawConfig};
use crate::config::validate::validate_config;
use crate::errors::{PenwatchError, Result};
use crate::signals::SignalTable;

/// Parse TOML text into a `RawConfig` without resolving signal names.
///
/// `path` is only used to label errors.
pub fn parse_raw(path: &Path, text: &str) -> Result<RawConfig> {
    toml::from_str(text).map_err(|e| PenwatchError::config(path, e))
}

/// Parse and validate TOML text.
pub fn parse(path: &Path, text: &str, signals: &SignalTable) -> Result<Config> {
    let raw = parse_raw(path, text)?;
    validate_config(path, raw, signals)
}

/// Read, parse and validate a config file.
///
/// This is the entry point for the rest of the application. Every failure
/// is reported as [`PenwatchError::ConfigError`] naming the file.
pub fn load_and_validate(path: impl AsRef<Path>, signals: &SignalTable) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| PenwatchError::config(path, e))?;
    parse(path, &contents, signals)
}

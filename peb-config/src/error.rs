//! Typed error variants for the peb-config crate.
//!
//! Callers at the application boundary match on these to tell a missing
//! settings file (fatal at startup) apart from a malformed one or a rejected
//! runtime update.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading, saving, or updating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file does not exist at any of the searched locations.
    #[error("settings file is missing: {}", .0.display())]
    Missing(PathBuf),

    /// An I/O error occurred reading or writing the settings file.
    #[error("I/O error on settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file contained invalid YAML.
    #[error("YAML parse error in settings file: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A field value failed semantic validation.
    #[error("settings validation error: {0}")]
    Validation(String),

    /// A runtime update named a key outside the writable subset.
    #[error("unknown or read-only setting: {0}")]
    UnknownSetting(String),
}

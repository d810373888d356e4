//! Configuration system for the Perl Executing Browser shell.
//!
//! This crate provides configuration loading, saving, and default values
//! for the shell. It includes:
//!
//! - The sectioned [`Config`] document and its YAML persistence
//! - The environment-variable allow-list applied to spawned scripts
//! - The runtime-writable [`SettingsStore`] used by the settings page

pub mod config;
pub mod defaults;
pub mod error;
pub mod settings_store;
mod types;

pub use config::{
    Config, DebuggerConfig, EnvironmentConfig, GuiConfig, InterpreterConfig, LoggingConfig,
    NetworkConfig, RootConfig, ScriptsConfig, is_env_var_allowed,
};
pub use error::ConfigError;
pub use settings_store::{RuntimeSettings, SettingKey, SettingsStore};
pub use types::{LogLevel, LogMode, WindowSize};

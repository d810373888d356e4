//! Settings document management.
//!
//! # Sub-modules
//!
//! - [`config_struct`]: the sectioned `Config` struct and its defaults
//! - [`persistence`]: `impl Config` methods for lookup, load, save, validation
//! - [`env_vars`]: environment-variable allow-list for spawned scripts

pub mod config_struct;
pub mod env_vars;
pub mod persistence;

pub use config_struct::{
    Config, DebuggerConfig, EnvironmentConfig, GuiConfig, InterpreterConfig, LoggingConfig,
    NetworkConfig, RootConfig, ScriptsConfig,
};
pub use env_vars::{PER_REQUEST_VARS, filter_allowed, is_env_var_allowed};
pub use persistence::SETTINGS_FILE_NAME;

//! Typed error type for the application shell.
//!
//! Library failures (`ConfigError`, `RunError`) are folded into the shell's
//! taxonomy so the top level can decide between a dialog that keeps the
//! application interactive and a fatal dialog followed by exit.

use peb_config::ConfigError;
use peb_scripting::RunError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    // -----------------------------------------------------------------------
    // Startup (fatal)
    // -----------------------------------------------------------------------
    /// The settings file or the start page is absent.
    #[error("'{}' is missing. Please restore the missing file.", .0.display())]
    ConfigurationMissing(PathBuf),

    /// The settings file exists but cannot be used.
    #[error("Invalid settings: {0}")]
    InvalidConfiguration(ConfigError),

    /// Started with administrative privileges.
    #[error("Running with administrative privileges is not allowed. Exiting.")]
    PrivilegeViolation,

    // -----------------------------------------------------------------------
    // Per-navigation (non-fatal)
    // -----------------------------------------------------------------------
    /// A navigation refers to a script or file that does not exist.
    #[error("'{}' is missing. Please restore the missing file.", .0.display())]
    ScriptMissing(PathBuf),

    /// The interpreter for a script cannot be found.
    #[error("Interpreter not found: {0}")]
    InterpreterMissing(String),

    /// A blocking script ran out of time and was killed.
    #[error("{0}")]
    ProcessTimeout(RunError),

    /// The OS failed to start an interpreter.
    #[error("{0}")]
    ProcessSpawnFailure(RunError),

    /// Any other script or debugger failure.
    #[error("{0}")]
    Script(RunError),

    /// A settings-page update could not be applied.
    #[error("Settings not saved: {0}")]
    SettingsUpdate(ConfigError),

    /// A theme could not be listed or applied.
    #[error("Theme '{name}' not applied: {source}")]
    Theme {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The system browser or an external application could not be started.
    #[error("Cannot open '{target}': {source}")]
    External {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl ShellError {
    /// Fatal errors end the application after their dialog is shown.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::ConfigurationMissing(_)
                | ShellError::InvalidConfiguration(_)
                | ShellError::PrivilegeViolation
        )
    }

    /// Title of the dialog reporting this error.
    pub fn title(&self) -> &'static str {
        match self {
            ShellError::ConfigurationMissing(_) | ShellError::InvalidConfiguration(_) => {
                "Missing or invalid configuration"
            }
            ShellError::PrivilegeViolation => "Administrative privileges",
            ShellError::ScriptMissing(_) => "Missing file",
            ShellError::InterpreterMissing(_) => "Missing interpreter",
            ShellError::ProcessTimeout(_) => "Script timeout",
            ShellError::ProcessSpawnFailure(_) | ShellError::Script(_) => "Script error",
            ShellError::SettingsUpdate(_) => "Settings",
            ShellError::Theme { .. } => "Themes",
            ShellError::External { .. } => "External application",
        }
    }
}

impl From<ConfigError> for ShellError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing(path) => ShellError::ConfigurationMissing(path),
            other => ShellError::InvalidConfiguration(other),
        }
    }
}

impl From<RunError> for ShellError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::ScriptMissing(path) => ShellError::ScriptMissing(path),
            RunError::InterpreterMissing { interpreter } => {
                ShellError::InterpreterMissing(interpreter)
            }
            err @ RunError::Timeout { .. } => ShellError::ProcessTimeout(err),
            err @ RunError::SpawnFailed { .. } => ShellError::ProcessSpawnFailure(err),
            other => ShellError::Script(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn startup_errors_are_fatal() {
        let missing: ShellError = ConfigError::Missing(PathBuf::from("peb.yaml")).into();
        assert!(matches!(missing, ShellError::ConfigurationMissing(_)));
        assert!(missing.is_fatal());
        assert!(ShellError::PrivilegeViolation.is_fatal());
    }

    #[test]
    fn script_errors_keep_the_shell_running() {
        let timeout: ShellError = RunError::Timeout {
            script: PathBuf::from("slow.pl"),
            after: Duration::from_secs(30),
        }
        .into();
        assert!(matches!(timeout, ShellError::ProcessTimeout(_)));
        assert!(!timeout.is_fatal());

        let missing: ShellError = RunError::ScriptMissing(PathBuf::from("gone.pl")).into();
        assert_eq!(missing.title(), "Missing file");
        assert!(!missing.is_fatal());
    }
}

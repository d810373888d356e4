//! Typed errors for script execution.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single script dispatch or debugger interaction.
#[derive(Debug, Error)]
pub enum RunError {
    /// The configured interpreter is not an existing file and cannot be
    /// found on the script's search path.
    #[error("interpreter '{interpreter}' not found")]
    InterpreterMissing { interpreter: String },

    /// No interpreter is configured for the script's extension.
    #[error("no interpreter configured for '{}'", .script.display())]
    NoInterpreterForExtension { script: PathBuf },

    /// The script a navigation refers to does not exist.
    #[error("script '{}' is missing", .0.display())]
    ScriptMissing(PathBuf),

    /// The OS refused to start the interpreter.
    #[error("failed to start '{}': {source}", .interpreter.display())]
    SpawnFailed {
        interpreter: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking script outlived its time budget and was killed.
    #[error("script '{}' timed out after {}s", .script.display(), .after.as_secs())]
    Timeout { script: PathBuf, after: Duration },

    /// I/O error preparing output files or talking to the child.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A command was sent to a slot with no live process.
    #[error("no running process in slot {0}")]
    NotRunning(&'static str),

    /// A debugger restart was requested before any script was selected.
    #[error("no script selected for debugging")]
    NoDebugTarget,

    /// A configured regular expression failed to compile.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

//! Process session descriptions and identifiers.

use crate::environment::ScriptEnvironment;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier of a spawned session, never reused within a process.
///
/// Ids increase monotonically, so they double as the generation counter that
/// lets event routing discard output from superseded sessions.
pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_session_id() -> SessionId {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// How the caller waits for the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The caller blocks until exit or timeout.
    Blocking,
    /// The child runs detached; output arrives as events.
    LongRunning,
}

/// Where the child's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Stdout into `stdout`; stderr into `stderr` or discarded when `None`.
    TempFile {
        stdout: PathBuf,
        stderr: Option<PathBuf>,
    },
    /// Both streams are read incrementally and emitted as events.
    Stream,
}

/// What the child's stdin is connected to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StdinMode {
    #[default]
    Closed,
    /// Written once, then closed (CGI POST body).
    Payload(Vec<u8>),
    /// Kept open for line commands (debugger).
    Interactive,
}

/// Everything needed to start one interpreter process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSession {
    /// Resolved interpreter binary.
    pub interpreter: PathBuf,
    /// Arguments placed before the script path, e.g. `-d`.
    pub interpreter_args: Vec<String>,
    pub script: PathBuf,
    pub working_dir: PathBuf,
    /// The child's complete environment; nothing else is inherited.
    pub environment: ScriptEnvironment,
    pub mode: ExecutionMode,
    pub sink: OutputSink,
    pub stdin: StdinMode,
}

impl ProcessSession {
    /// Session whose working directory is the script's own directory.
    pub fn new(
        interpreter: impl Into<PathBuf>,
        script: impl Into<PathBuf>,
        environment: ScriptEnvironment,
        mode: ExecutionMode,
        sink: OutputSink,
    ) -> Self {
        let script = script.into();
        let working_dir = script
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            interpreter: interpreter.into(),
            interpreter_args: Vec::new(),
            script,
            working_dir,
            environment,
            mode,
            sink,
            stdin: StdinMode::Closed,
        }
    }

    pub fn with_interpreter_args(mut self, args: Vec<String>) -> Self {
        self.interpreter_args = args;
        self
    }

    pub fn with_stdin(mut self, stdin: StdinMode) -> Self {
        self.stdin = stdin;
        self
    }
}

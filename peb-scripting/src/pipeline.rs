//! Script execution pipeline for one window.
//!
//! Turns a [`ScriptRequest`] into a running interpreter: resolves the
//! interpreter from the script's extension, builds the script environment,
//! and dispatches to the [`ProcessRunner`](crate::process::ProcessRunner)
//! either blocking (output lands in a per-window temp file) or detached in
//! the window's [`Slot::Script`].

use std::fmt;
use std::path::{Path, PathBuf};

use peb_config::{Config, RuntimeSettings};

use crate::environment::{PendingSignals, RequestMethod, RequestVars, ScriptEnvironment};
use crate::error::RunError;
use crate::frame::{FrameRef, WindowId};
use crate::manager::{Slot, SlotManager};
use crate::process::{BlockingOutput, resolve_interpreter};
use crate::session::{ExecutionMode, OutputSink, ProcessSession, SessionId, StdinMode};

/// A classified request to run a local script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    /// Absolute path of the script file.
    pub script: PathBuf,
    pub query: String,
    pub post_body: Option<String>,
    pub method: RequestMethod,
    pub long_running: bool,
}

/// Where a long-running script's output is rendered, fixed at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    /// Stream into the frame the request came from.
    InPlace(FrameRef),
    /// Stream into a window created for this script.
    NewWindow,
}

/// Lifecycle of the window's current script invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationState {
    #[default]
    Idle,
    Dispatched,
    Blocked,
    Running(SessionId),
    Completed,
    Killed,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationState::Idle => f.write_str("idle"),
            InvocationState::Dispatched => f.write_str("dispatched"),
            InvocationState::Blocked => f.write_str("blocked"),
            InvocationState::Running(id) => write!(f, "running({})", id),
            InvocationState::Completed => f.write_str("completed"),
            InvocationState::Killed => f.write_str("killed"),
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A blocking script exited; its output file is ready to load.
    Completed(BlockingOutput),
    /// A long-running script is now streaming output to `target`.
    Started {
        session: SessionId,
        target: OutputTarget,
    },
}

/// Script dispatch state of one window.
#[derive(Debug)]
pub struct ScriptPipeline {
    window: WindowId,
    state: InvocationState,
    signals: PendingSignals,
    running: Option<(SessionId, OutputTarget)>,
    temp_dir: PathBuf,
    host_env: Option<Vec<(String, String)>>,
}

impl ScriptPipeline {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            state: InvocationState::Idle,
            signals: PendingSignals::default(),
            running: None,
            temp_dir: std::env::temp_dir(),
            host_env: None,
        }
    }

    /// Write blocking output below `dir` instead of the system temp folder.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Use a fixed host environment instead of the shell's own.
    pub fn with_host_env(mut self, vars: Vec<(String, String)>) -> Self {
        self.host_env = Some(vars);
        self
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn signals(&self) -> &PendingSignals {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut PendingSignals {
        &mut self.signals
    }

    /// Stdout file of this window's blocking scripts.
    pub fn output_path(&self) -> PathBuf {
        self.temp_path("output.htm")
    }

    /// Stderr file of this window's blocking scripts.
    pub fn error_path(&self) -> PathBuf {
        self.temp_path("errors.txt")
    }

    fn temp_path(&self, suffix: &str) -> PathBuf {
        self.temp_dir.join(format!(
            "peb-{}-w{}-{}",
            std::process::id(),
            self.window,
            suffix
        ))
    }

    fn transition(&mut self, next: InvocationState) {
        log::debug!("Window {} script: {} -> {}", self.window, self.state, next);
        self.state = next;
    }

    /// The long-running session dispatched from this window, if any.
    pub fn running(&self) -> Option<(SessionId, OutputTarget)> {
        self.running
    }

    /// Target of a long-running session dispatched from this window.
    pub fn target_of(&self, session: SessionId) -> Option<OutputTarget> {
        self.running
            .filter(|(id, _)| *id == session)
            .map(|(_, target)| target)
    }

    /// Point a session's output at a window created for it.
    pub fn retarget(&mut self, session: SessionId, target: OutputTarget) {
        if let Some((id, current)) = self.running.as_mut()
            && *id == session
        {
            *current = target;
        }
    }

    /// Run `request`, blocking until exit for ordinary scripts.
    ///
    /// One-shot picker signals are consumed by blocking scripts and passed
    /// through unchanged to long-running ones.
    pub fn dispatch(
        &mut self,
        config: &Config,
        settings: &RuntimeSettings,
        request: &ScriptRequest,
        origin: FrameRef,
        slots: &mut SlotManager,
    ) -> Result<DispatchOutcome, RunError> {
        if !request.script.is_file() {
            return Err(RunError::ScriptMissing(request.script.clone()));
        }
        let interpreter_name = interpreter_for(config, settings, &request.script)?;

        let signals = if request.long_running {
            self.signals.clone()
        } else {
            self.signals.take()
        };
        let body = request.post_body.as_deref().filter(|_| request.method == RequestMethod::Post);
        let vars = RequestVars {
            method: request.method,
            query: &request.query,
            content_length: body.map(str::len),
        };
        let host = match &self.host_env {
            Some(vars) => vars.clone(),
            None => ScriptEnvironment::host_vars(),
        };
        let environment = ScriptEnvironment::for_request(config, settings, host, &vars, &signals);

        let search_path = environment.search_path();
        let interpreter = resolve_interpreter(
            interpreter_name,
            &config.root_dir(),
            search_path.as_deref(),
        )?;
        log::info!(
            "Window {}: dispatching {:?} with {:?} ({} mode)",
            self.window,
            request.script,
            interpreter,
            if request.long_running { "long-running" } else { "blocking" }
        );
        self.transition(InvocationState::Dispatched);

        let stdin = match body {
            Some(body) => StdinMode::Payload(body.as_bytes().to_vec()),
            None => StdinMode::Closed,
        };

        if request.long_running {
            let session = ProcessSession::new(
                interpreter,
                &request.script,
                environment,
                ExecutionMode::LongRunning,
                OutputSink::Stream,
            )
            .with_stdin(stdin);
            if let Some((previous, _)) = self.running.take() {
                log::info!("Window {}: session {} replaced", self.window, previous);
                self.transition(InvocationState::Killed);
            }
            let id = match slots.start(Slot::Script, session) {
                Ok(id) => id,
                Err(e) => {
                    self.transition(InvocationState::Idle);
                    return Err(e);
                }
            };
            let target = if origin.is_top() {
                OutputTarget::NewWindow
            } else {
                OutputTarget::InPlace(origin)
            };
            self.running = Some((id, target));
            self.transition(InvocationState::Running(id));
            return Ok(DispatchOutcome::Started {
                session: id,
                target,
            });
        }

        let sink = OutputSink::TempFile {
            stdout: self.output_path(),
            stderr: config.scripts.display_stderr.then(|| self.error_path()),
        };
        let session = ProcessSession::new(
            interpreter,
            &request.script,
            environment,
            ExecutionMode::Blocking,
            sink,
        )
        .with_stdin(stdin);

        self.transition(InvocationState::Blocked);
        let result = slots.runner().run_blocking(&session);
        match result {
            Ok(output) => {
                self.transition(InvocationState::Completed);
                self.transition(InvocationState::Idle);
                Ok(DispatchOutcome::Completed(output))
            }
            Err(e) => {
                self.transition(InvocationState::Idle);
                Err(e)
            }
        }
    }

    /// Record the end of a long-running session.
    ///
    /// Returns `false` for sessions this window no longer tracks.
    pub fn on_finished(&mut self, session: SessionId, killed: bool) -> bool {
        if self.target_of(session).is_none() {
            return false;
        }
        self.running = None;
        self.transition(if killed {
            InvocationState::Killed
        } else {
            InvocationState::Completed
        });
        self.transition(InvocationState::Idle);
        true
    }

    /// Remove this window's temp files.
    pub fn cleanup(&mut self) {
        for path in [self.output_path(), self.error_path()] {
            if path.exists()
                && let Err(e) = std::fs::remove_file(&path)
            {
                log::warn!("Could not remove {:?}: {}", path, e);
            }
        }
        self.running = None;
        self.state = InvocationState::Idle;
    }
}

/// Configured interpreter name for `script`, using the current settings.
pub fn interpreter_for<'a>(
    config: &Config,
    settings: &'a RuntimeSettings,
    script: &Path,
) -> Result<&'a str, RunError> {
    let no_interpreter = || RunError::NoInterpreterForExtension {
        script: script.to_path_buf(),
    };
    let extension = script
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(no_interpreter)?;
    let key = config
        .scripts
        .interpreter_key(extension)
        .ok_or_else(no_interpreter)?;
    settings
        .interpreters
        .get(key)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(no_interpreter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peb_config::SettingsStore;

    #[test]
    fn interpreter_follows_extension_case_insensitively() {
        let config = Config::default();
        let settings = SettingsStore::in_memory(&config).current().clone();
        let name = interpreter_for(&config, &settings, Path::new("/app/HELLO.PL")).unwrap();
        assert_eq!(name, settings.interpreters.perl);

        let err = interpreter_for(&config, &settings, Path::new("/app/hello.rb")).unwrap_err();
        assert!(matches!(err, RunError::NoInterpreterForExtension { .. }));
    }

    #[test]
    fn temp_paths_are_unique_per_window() {
        let a = ScriptPipeline::new(1);
        let b = ScriptPipeline::new(2);
        assert_ne!(a.output_path(), b.output_path());
        assert_ne!(a.output_path(), a.error_path());
    }

    #[test]
    fn finished_event_for_unknown_session_is_ignored() {
        let mut pipeline = ScriptPipeline::new(3);
        assert!(!pipeline.on_finished(42, false));
        assert_eq!(pipeline.state(), InvocationState::Idle);
    }
}

//! Line-debugger bridge.
//!
//! A debugger session runs the script under the interpreter's line debugger
//! in [`Slot::Debugger`]. Each user command is written to its stdin; the
//! output up to the next prompt forms one step. The source location named in
//! that step is rendered by the formatter (an external program in
//! [`Slot::Formatter`], or a built-in listing) and only then is the page
//! assembled. Commands arriving in between are queued and sent in order.
//!
//! ```text
//! Idle --start--> AwaitingOutput --prompt--> Formatting --formatter done--> Ready
//!                      ^                                                      |
//!                      +-------------------- submit(command) ----------------+
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use peb_config::{Config, DebuggerConfig, RuntimeSettings};
use regex::Regex;

use crate::environment::{PendingSignals, RequestVars, ScriptEnvironment};
use crate::error::RunError;
use crate::formatter::{DebuggerPage, highlight_listing};
use crate::frame::FrameRef;
use crate::manager::{Slot, SlotManager};
use crate::process::resolve_interpreter;
use crate::session::{ExecutionMode, OutputSink, ProcessSession, SessionId, StdinMode};

/// Step phase of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebuggerPhase {
    /// No debugger process.
    #[default]
    Idle,
    /// A command was sent; waiting for the next prompt.
    AwaitingOutput,
    /// The step is complete; the formatter is rendering its source.
    Formatting,
    /// The page is up to date and the debugger accepts a command.
    Ready,
}

/// Everything the displayed debugger page is built from.
///
/// Reset as a whole whenever a new debug target is selected or the session
/// is restarted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebuggerState {
    pub last_command: String,
    pub script_to_debug: Option<PathBuf>,
    /// Source file shown in the highlighted pane.
    pub source_highlight_path: Option<PathBuf>,
    pub source_line: Option<usize>,
    pub last_output_line: String,
    pub formatter_session: Option<SessionId>,
    pub transcript: String,
    pub highlighted_source: String,
}

/// Debugger integration for one window.
#[derive(Debug)]
pub struct DebuggerBridge {
    state: DebuggerState,
    phase: DebuggerPhase,
    session: Option<SessionId>,
    target: Option<FrameRef>,
    queue: VecDeque<String>,
    step_output: String,
    prompt: Regex,
    location: Regex,
    action_url: String,
    /// Base for relative interpreter and formatter paths.
    root: PathBuf,
    host_env: Option<Vec<(String, String)>>,
}

fn compile(pattern: &str) -> Result<Regex, RunError> {
    Regex::new(pattern).map_err(|source| RunError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl DebuggerBridge {
    pub fn new(config: &Config) -> Result<Self, RunError> {
        let debugger: &DebuggerConfig = &config.debugger;
        Ok(Self {
            state: DebuggerState::default(),
            phase: DebuggerPhase::Idle,
            session: None,
            target: None,
            queue: VecDeque::new(),
            step_output: String::new(),
            prompt: compile(&debugger.prompt_pattern)?,
            location: compile(&debugger.location_pattern)?,
            action_url: format!(
                "http://{}/{}",
                config.network.pseudo_domain, debugger.function_name
            ),
            root: config.root_dir(),
            host_env: None,
        })
    }

    /// Use a fixed host environment instead of the shell's own.
    pub fn with_host_env(mut self, vars: Vec<(String, String)>) -> Self {
        self.host_env = Some(vars);
        self
    }

    pub fn state(&self) -> &DebuggerState {
        &self.state
    }

    pub fn phase(&self) -> DebuggerPhase {
        self.phase
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Frame the debugger pages are sent to.
    pub fn target(&self) -> Option<FrameRef> {
        self.target
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Debug `script`, discarding any previous session and its state.
    pub fn start(
        &mut self,
        config: &Config,
        settings: &RuntimeSettings,
        script: &Path,
        target: FrameRef,
        slots: &mut SlotManager,
    ) -> Result<SessionId, RunError> {
        self.reset(slots);
        if !script.is_file() {
            return Err(RunError::ScriptMissing(script.to_path_buf()));
        }

        let host = self
            .host_env
            .clone()
            .unwrap_or_else(ScriptEnvironment::host_vars);
        let mut environment = ScriptEnvironment::for_request(
            config,
            settings,
            host,
            &RequestVars::default(),
            &PendingSignals::default(),
        );
        for (name, value) in &config.debugger.environment {
            environment.insert(name, value);
        }

        let name = settings
            .interpreters
            .get(&config.debugger.interpreter)
            .unwrap_or(config.debugger.interpreter.as_str());
        let interpreter =
            resolve_interpreter(name, &self.root, environment.search_path().as_deref())?;

        let session = ProcessSession::new(
            interpreter,
            script,
            environment,
            ExecutionMode::LongRunning,
            OutputSink::Stream,
        )
        .with_interpreter_args(config.debugger.interpreter_args.clone())
        .with_stdin(StdinMode::Interactive);

        let id = slots.start(Slot::Debugger, session)?;
        log::info!("Debugger session {} started for {:?}", id, script);
        self.session = Some(id);
        self.target = Some(target);
        self.state.script_to_debug = Some(script.to_path_buf());
        self.phase = DebuggerPhase::AwaitingOutput;
        Ok(id)
    }

    /// Start over with the current debug target.
    pub fn restart(
        &mut self,
        config: &Config,
        settings: &RuntimeSettings,
        slots: &mut SlotManager,
    ) -> Result<SessionId, RunError> {
        let script = self
            .state
            .script_to_debug
            .clone()
            .ok_or(RunError::NoDebugTarget)?;
        let target = self.target.ok_or(RunError::NoDebugTarget)?;
        self.start(config, settings, &script, target, slots)
    }

    /// Terminate both processes and clear all state.
    pub fn reset(&mut self, slots: &mut SlotManager) {
        slots.stop(Slot::Formatter);
        if let Some(old) = slots.stop(Slot::Debugger) {
            log::info!("Debugger session {} terminated", old);
        }
        self.state = DebuggerState::default();
        self.phase = DebuggerPhase::Idle;
        self.session = None;
        self.queue.clear();
        self.step_output.clear();
    }

    /// Send a command now if the debugger is ready, otherwise queue it.
    pub fn submit(&mut self, command: &str, slots: &mut SlotManager) -> Result<(), RunError> {
        if self.session.is_none() || !slots.is_running(Slot::Debugger) {
            return Err(RunError::NotRunning(Slot::Debugger.name()));
        }
        if self.phase == DebuggerPhase::Ready {
            self.send(command, slots)
        } else {
            log::debug!("Debugger busy ({:?}), queueing {:?}", self.phase, command);
            self.queue.push_back(command.to_string());
            Ok(())
        }
    }

    fn send(&mut self, command: &str, slots: &mut SlotManager) -> Result<(), RunError> {
        log::info!("Debugger command: {:?}", command);
        self.state.last_command = command.to_string();
        self.step_output.clear();
        self.phase = DebuggerPhase::AwaitingOutput;
        slots.send_line(Slot::Debugger, command)
    }

    fn send_queued(&mut self, slots: &mut SlotManager) -> Result<(), RunError> {
        match self.queue.pop_front() {
            Some(command) => self.send(&command, slots),
            None => Ok(()),
        }
    }

    /// Feed debugger output. Returns the page to display once a step is
    /// complete and no external formatter is involved.
    pub fn on_output(
        &mut self,
        session: SessionId,
        chunk: &str,
        settings: &RuntimeSettings,
        slots: &mut SlotManager,
    ) -> Result<Option<String>, RunError> {
        if self.session != Some(session) {
            log::debug!("Discarding output of superseded debugger session {}", session);
            return Ok(None);
        }
        self.state.transcript.push_str(chunk);
        self.step_output.push_str(chunk);

        if self.phase != DebuggerPhase::AwaitingOutput || !self.prompt.is_match(&self.step_output)
        {
            return Ok(None);
        }

        self.state.last_output_line = last_output_line(&self.step_output, &self.prompt);
        let location = self.current_location();
        self.step_output.clear();

        let Some((source, line)) = location else {
            return self.complete_step(slots);
        };
        self.state.source_highlight_path = Some(source.clone());
        self.state.source_line = Some(line);

        if let Some(formatter) = settings.debug_formatter.as_deref() {
            match self.start_formatter(formatter, &source, slots) {
                Ok(id) => {
                    self.state.formatter_session = Some(id);
                    self.state.highlighted_source.clear();
                    self.phase = DebuggerPhase::Formatting;
                    return Ok(None);
                }
                Err(e) => log::warn!("Formatter failed, using built-in listing: {}", e),
            }
        }

        self.state.highlighted_source = match std::fs::read_to_string(&source) {
            Ok(text) => highlight_listing(&text, line),
            Err(e) => {
                log::warn!("Cannot read debugged source {:?}: {}", source, e);
                String::new()
            }
        };
        self.complete_step(slots)
    }

    /// Collect formatter output for the current step.
    pub fn on_formatter_output(&mut self, session: SessionId, chunk: &str) {
        if self.state.formatter_session == Some(session) {
            self.state.highlighted_source.push_str(chunk);
        }
    }

    /// The formatter exited: assemble the page for the step.
    pub fn on_formatter_finished(
        &mut self,
        session: SessionId,
        slots: &mut SlotManager,
    ) -> Result<Option<String>, RunError> {
        if self.state.formatter_session != Some(session) || self.phase != DebuggerPhase::Formatting
        {
            return Ok(None);
        }
        self.state.formatter_session = None;
        self.complete_step(slots)
    }

    /// The debugger process exited on its own.
    pub fn on_debugger_finished(&mut self, session: SessionId) -> Option<String> {
        if self.session != Some(session) {
            return None;
        }
        log::info!("Debugger session {} ended", session);
        self.session = None;
        self.phase = DebuggerPhase::Idle;
        self.queue.clear();
        Some(self.render(Some("Debugger session ended.")))
    }

    fn complete_step(&mut self, slots: &mut SlotManager) -> Result<Option<String>, RunError> {
        self.phase = DebuggerPhase::Ready;
        let page = self.render(None);
        self.send_queued(slots)?;
        Ok(Some(page))
    }

    fn current_location(&self) -> Option<(PathBuf, usize)> {
        let captures = self.location.captures_iter(&self.step_output).last()?;
        let file = captures.get(1)?.as_str();
        let line = captures.get(2)?.as_str().parse().ok()?;
        let path = PathBuf::from(file);
        let path = if path.is_relative() {
            self.state
                .script_to_debug
                .as_deref()
                .and_then(Path::parent)
                .map(|dir| dir.join(&path))
                .unwrap_or(path)
        } else {
            path
        };
        Some((path, line))
    }

    fn start_formatter(
        &self,
        formatter: &str,
        source: &Path,
        slots: &mut SlotManager,
    ) -> Result<SessionId, RunError> {
        let host = self
            .host_env
            .clone()
            .unwrap_or_else(ScriptEnvironment::host_vars);
        let allowed = Vec::from([peb_config::defaults::path_variable()]);
        let environment = ScriptEnvironment::from_allowed(host, &allowed);
        let program =
            resolve_interpreter(formatter, &self.root, environment.search_path().as_deref())?;
        let session = ProcessSession::new(
            program,
            source,
            environment,
            ExecutionMode::LongRunning,
            OutputSink::Stream,
        );
        slots.start(Slot::Formatter, session)
    }

    fn render(&self, status: Option<&str>) -> String {
        let script = self
            .state
            .script_to_debug
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        DebuggerPage {
            action: &self.action_url,
            script: &script,
            last_command: &self.state.last_command,
            transcript: &self.state.transcript,
            source_html: &self.state.highlighted_source,
            status,
        }
        .render()
    }
}

/// Last non-empty output line of a step, ignoring the prompt itself.
fn last_output_line(step: &str, prompt: &Regex) -> String {
    step.lines()
        .rev()
        .map(|line| prompt.replace_all(line, "").trim().to_string())
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

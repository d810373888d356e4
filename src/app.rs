//! Application shell: windows, navigation entry point and event routing.
//!
//! [`Shell`] owns the immutable [`Config`], the runtime [`SettingsStore`],
//! one [`WindowState`] per renderer window, and the receiving end of the
//! script event channel. Everything runs on the caller's thread; detached
//! child processes report back through [`ScriptEvent`]s that
//! [`Shell::handle_event`] routes by session id.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use peb_config::{Config, SettingsStore};
use peb_scripting::{
    DebuggerBridge, FrameRef, OutputStream, OutputTarget, ProcessRunner, ScriptEvent,
    ScriptPipeline, Slot, SlotManager, WindowId,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::desktop::Desktop;
use crate::error::ShellError;
use crate::frames::FrameManager;
use crate::navigation::{Classifier, NavigationRequest};
use crate::theme::ThemeManager;

/// Everything the shell tracks for one renderer window.
pub struct WindowState {
    pub id: WindowId,
    /// Detached processes started from this window.
    pub slots: SlotManager,
    /// Script dispatch and output routing.
    pub pipeline: ScriptPipeline,
    /// The window's debugger session, if any.
    pub debugger: DebuggerBridge,
}

/// Input for the shell's main loop.
#[derive(Debug)]
pub enum ShellInput {
    /// A URL typed or clicked in the main window.
    Line(String),
    Event(ScriptEvent),
    /// The line source is exhausted.
    Closed,
}

pub struct Shell {
    pub(crate) config: Config,
    pub(crate) settings: SettingsStore,
    pub(crate) windows: BTreeMap<WindowId, WindowState>,
    pub(crate) frames: Box<dyn FrameManager>,
    pub(crate) desktop: Box<dyn Desktop>,
    pub(crate) themes: ThemeManager,
    runner: ProcessRunner,
    events_tx: UnboundedSender<ScriptEvent>,
    events_rx: UnboundedReceiver<ScriptEvent>,
    next_window: WindowId,
    host_env: Option<Vec<(String, String)>>,
    temp_dir: Option<PathBuf>,
    quit: bool,
}

impl Shell {
    /// Create the shell. `runtime` must belong to a multi-threaded runtime.
    pub fn new(
        config: Config,
        settings: SettingsStore,
        runtime: Handle,
        frames: Box<dyn FrameManager>,
        desktop: Box<dyn Desktop>,
    ) -> Result<Self, ShellError> {
        // Reject bad debugger patterns at startup, not on first use.
        DebuggerBridge::new(&config)?;

        let (events_tx, events_rx) = unbounded_channel();
        let runner = ProcessRunner::new(
            runtime,
            Duration::from_secs(config.scripts.timeout_secs),
        );
        Ok(Self {
            themes: ThemeManager::new(config.themes_dir()),
            config,
            settings,
            windows: BTreeMap::new(),
            frames,
            desktop,
            runner,
            events_tx,
            events_rx,
            next_window: 1,
            host_env: None,
            temp_dir: None,
            quit: false,
        })
    }

    /// Give scripts this host environment instead of the shell's own.
    pub fn with_host_env(mut self, vars: Vec<(String, String)>) -> Self {
        self.host_env = Some(vars);
        self
    }

    /// Write blocking script output below `dir`.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Settings document as loaded at startup.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Values the settings page can change.
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn window(&self, id: WindowId) -> Option<&WindowState> {
        self.windows.get(&id)
    }

    /// Open windows in ascending id order.
    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    /// Whether `quit:` was handled or the shell has shut down.
    pub fn is_quitting(&self) -> bool {
        self.quit
    }

    /// Open the first window on the start page.
    pub fn start(&mut self) -> Result<WindowId, ShellError> {
        let start_page = self.config.start_page_path();
        if !start_page.is_file() {
            return Err(ShellError::ConfigurationMissing(start_page));
        }
        let id = self.open_window()?;
        self.frames.load_file(FrameRef::top(id), &start_page);
        Ok(id)
    }

    /// Create a window and its script slots.
    pub fn open_window(&mut self) -> Result<WindowId, ShellError> {
        let id = self.next_window;
        self.next_window += 1;

        let sink = Arc::new(self.events_tx.clone());
        let slots = SlotManager::new(self.runner.clone(), sink);
        let mut pipeline = ScriptPipeline::new(id);
        let mut debugger = DebuggerBridge::new(&self.config)?;
        if let Some(dir) = &self.temp_dir {
            pipeline = pipeline.with_temp_dir(dir);
        }
        if let Some(vars) = &self.host_env {
            pipeline = pipeline.with_host_env(vars.clone());
            debugger = debugger.with_host_env(vars.clone());
        }

        self.frames.create_window(id);
        self.windows.insert(
            id,
            WindowState {
                id,
                slots,
                pipeline,
                debugger,
            },
        );
        log::info!("Window {} opened", id);
        Ok(id)
    }

    /// Close a window, terminating every process it owns.
    pub fn close_window(&mut self, id: WindowId) {
        let Some(mut window) = self.windows.remove(&id) else {
            return;
        };
        window.slots.stop_all();
        window.pipeline.cleanup();

        // Scripts elsewhere that stream into this window lose their target.
        for other in self.windows.values_mut() {
            if let Some((session, OutputTarget::InPlace(frame))) = other.pipeline.running()
                && frame.window == id
            {
                log::info!("Stopping session {}: its output window closed", session);
                other.slots.stop(Slot::Script);
                other.pipeline.on_finished(session, true);
            }
        }

        self.frames.close_window(id);
        log::info!("Window {} closed", id);
        if self.windows.is_empty() {
            self.quit = true;
        }
    }

    /// Close every window and stop all processes.
    pub fn shutdown(&mut self) {
        for id in self.window_ids() {
            self.close_window(id);
        }
        self.quit = true;
    }

    /// Classify and enact a navigation. Returns whether the renderer should
    /// continue with its default handling.
    pub fn navigate(&mut self, request: &NavigationRequest) -> bool {
        let action = Classifier::new(&self.config).classify(request);
        log::info!("{} from {}: {}", request.url, request.origin, action);
        self.enact(request, action)
    }

    /// Treat `text` as a link clicked in the first window's top frame.
    /// Paths starting with `/` are taken relative to the pseudo-domain.
    pub fn navigate_text(&mut self, text: &str) -> bool {
        let text = text.trim();
        let Some(window) = self.windows.keys().next().copied() else {
            log::warn!("No window to navigate in");
            return false;
        };
        let url = if text.starts_with('/') {
            format!("http://{}{}", self.config.network.pseudo_domain, text)
        } else {
            text.to_string()
        };
        match NavigationRequest::link(&url, FrameRef::top(window)) {
            Ok(request) => self.navigate(&request),
            Err(e) => {
                log::warn!("Ignoring invalid URL '{}': {}", text, e);
                false
            }
        }
    }

    pub(crate) fn report(&self, err: &ShellError) {
        log::warn!("{}", err);
        self.desktop.show_error(err.title(), &err.to_string());
    }

    /// Wait up to `timeout` for the next script event.
    pub fn wait_event(&mut self, timeout: Duration) -> Option<ScriptEvent> {
        let events = &mut self.events_rx;
        self.runner
            .runtime()
            .block_on(async { tokio::time::timeout(timeout, events.recv()).await })
            .ok()
            .flatten()
    }

    /// Sessions in any window whose `Finished` event has not been handled.
    pub fn live_sessions(&self) -> usize {
        self.windows.values().map(|w| w.slots.live_count()).sum()
    }

    /// Wait for either an input line or a script event. Once `lines` has
    /// closed, only events are waited for.
    pub fn next_input(
        &mut self,
        lines: &mut UnboundedReceiver<String>,
        input_open: bool,
    ) -> ShellInput {
        let events = &mut self.events_rx;
        self.runner.runtime().block_on(async {
            tokio::select! {
                Some(event) = events.recv() => ShellInput::Event(event),
                line = lines.recv(), if input_open => match line {
                    Some(line) => ShellInput::Line(line),
                    None => ShellInput::Closed,
                },
                else => ShellInput::Closed,
            }
        })
    }

    /// Drive the shell from `lines` until quit, or until input has ended and
    /// no process is left running.
    pub fn run(&mut self, lines: &mut UnboundedReceiver<String>) {
        let mut input_open = true;
        while !self.quit {
            if !input_open && self.live_sessions() == 0 {
                break;
            }
            match self.next_input(lines, input_open) {
                ShellInput::Line(line) if line.trim().is_empty() => {}
                ShellInput::Line(line) => {
                    self.navigate_text(&line);
                }
                ShellInput::Event(event) => self.handle_event(event),
                ShellInput::Closed if !input_open => break,
                ShellInput::Closed => {
                    log::info!("Input closed");
                    input_open = false;
                }
            }
        }
        self.shutdown();
    }

    /// Route one script event to the window and slot that own its session.
    /// Events of superseded sessions are dropped.
    pub fn handle_event(&mut self, event: ScriptEvent) {
        let session = event.session();
        let owner = self
            .windows
            .iter()
            .find_map(|(id, w)| w.slots.slot_of(session).map(|slot| (*id, slot)));
        let Some((window_id, slot)) = owner else {
            log::debug!("Dropping event of stale session {}", session);
            return;
        };

        let Self {
            windows,
            frames,
            settings,
            config,
            ..
        } = self;
        let Some(window) = windows.get_mut(&window_id) else {
            return;
        };

        let page = match (slot, event) {
            (_, ScriptEvent::Started { .. }) => Ok(None),

            (Slot::Script, ScriptEvent::OutputReady { stream, chunk, .. }) => {
                if stream == OutputStream::Stderr && !config.scripts.display_stderr {
                    log::debug!("Session {} stderr: {}", session, chunk.trim_end());
                } else {
                    match window.pipeline.target_of(session) {
                        Some(OutputTarget::InPlace(frame)) => frames.append_output(frame, &chunk),
                        _ => log::warn!("Session {} has no output frame", session),
                    }
                }
                Ok(None)
            }
            (Slot::Script, ScriptEvent::Finished { killed, .. }) => {
                window.slots.finish(session);
                window.pipeline.on_finished(session, killed);
                Ok(None)
            }

            (Slot::Debugger, ScriptEvent::OutputReady { chunk, .. }) => {
                window
                    .debugger
                    .on_output(session, &chunk, settings.current(), &mut window.slots)
            }
            (Slot::Debugger, ScriptEvent::Finished { .. }) => {
                window.slots.finish(session);
                Ok(window.debugger.on_debugger_finished(session))
            }

            (Slot::Formatter, ScriptEvent::OutputReady { stream, chunk, .. }) => {
                if stream == OutputStream::Stdout {
                    window.debugger.on_formatter_output(session, &chunk);
                }
                Ok(None)
            }
            (Slot::Formatter, ScriptEvent::Finished { .. }) => {
                window.slots.finish(session);
                window
                    .debugger
                    .on_formatter_finished(session, &mut window.slots)
            }
        };

        let result = page.map(|page| {
            if let (Some(html), Some(target)) = (page, window.debugger.target()) {
                frames.set_html(target, &html);
            }
        });

        if let Err(e) = result {
            self.report(&e.into());
        }
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.shutdown();
    }
}

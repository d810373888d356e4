//! Navigation Policy Enactor: performs the side effect of a classification.

use std::path::PathBuf;

use peb_config::SettingKey;
use peb_scripting::{
    DispatchOutcome, FrameRef, OutputTarget, RunError, ScriptRequest, WindowId,
};
use url::Url;

use crate::app::Shell;
use crate::error::ShellError;
use crate::frames::PrintMode;
use crate::navigation::{ClassifiedAction, DebuggerAction, NavigationRequest, PseudoCommand};
use crate::settings_page;

impl Shell {
    /// Act on `action`. Returns whether the renderer's default navigation
    /// should proceed, which is only the case for [`ClassifiedAction::Reject`].
    pub fn enact(&mut self, request: &NavigationRequest, action: ClassifiedAction) -> bool {
        let origin = request.origin;
        match action {
            ClassifiedAction::RunScript {
                path,
                query,
                post_body,
                method,
                long_running,
            } => {
                let script = ScriptRequest {
                    script: path,
                    query,
                    post_body,
                    method,
                    long_running,
                };
                if let Err(e) = self.run_script(&script, origin) {
                    self.report(&e);
                }
            }
            ClassifiedAction::LoadLocalFile { path } => {
                if path.is_file() {
                    self.frames.load_file(origin, &path);
                } else {
                    self.report(&ShellError::ScriptMissing(path));
                }
            }
            ClassifiedAction::RunPseudoCommand(command) => {
                if let Err(e) = self.run_pseudo_command(command, origin) {
                    self.report(&e);
                }
            }
            ClassifiedAction::OpenRemoteInSameWindow { url } => {
                self.frames.load_url(origin, &url);
            }
            ClassifiedAction::OpenRemoteInNewWindow { url } => {
                match self.open_window() {
                    Ok(window) => {
                        self.frames.load_url(FrameRef::top(window), &url);
                        self.desktop.notify("Allowed web link", url.as_str());
                    }
                    Err(e) => self.report(&e),
                }
            }
            ClassifiedAction::DelegateToSystemBrowser { url } => self.delegate(&url),
            ClassifiedAction::DebuggerCommand { action, script } => {
                if let Err(e) = self.debugger_command(action, script, origin) {
                    self.report(&e.into());
                }
            }
            ClassifiedAction::MissingFile { path } => {
                self.report(&ShellError::ScriptMissing(path));
            }
            ClassifiedAction::Reject => return true,
        }
        false
    }

    fn run_script(&mut self, script: &ScriptRequest, origin: FrameRef) -> Result<(), ShellError> {
        let window_id = origin.window;
        let Self {
            windows,
            config,
            settings,
            ..
        } = self;
        let Some(window) = windows.get_mut(&window_id) else {
            log::warn!("Script requested from closed window {}", window_id);
            return Ok(());
        };

        let outcome = window.pipeline.dispatch(
            config,
            settings.current(),
            script,
            origin,
            &mut window.slots,
        )?;

        match outcome {
            DispatchOutcome::Completed(output) => {
                log::info!(
                    "{:?} exited with {:?} after {:?}",
                    script.script,
                    output.exit_code,
                    output.elapsed
                );
                self.frames.clear_memory_caches();
                self.frames.load_file(origin, &output.stdout);
                if let Some(path) = output.stderr {
                    match std::fs::read_to_string(&path) {
                        Ok(errors) if !errors.trim().is_empty() => {
                            self.desktop.show_error("Script errors", errors.trim_end());
                        }
                        Ok(_) => {}
                        Err(e) => log::warn!("Cannot read script errors {:?}: {}", path, e),
                    }
                }
            }
            DispatchOutcome::Started { session, target } => {
                let name = script
                    .script
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.desktop
                    .notify("Long-running script started", &name);
                if target == OutputTarget::NewWindow {
                    let output_window = self.open_window()?;
                    if let Some(window) = self.windows.get_mut(&window_id) {
                        window.pipeline.retarget(
                            session,
                            OutputTarget::InPlace(FrameRef::top(output_window)),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn run_pseudo_command(
        &mut self,
        command: PseudoCommand,
        origin: FrameRef,
    ) -> Result<(), ShellError> {
        let window = origin.window;
        let main_frame = FrameRef::top(window);
        let start_dir = dirs::home_dir().unwrap_or_else(|| self.config.root_dir());

        match command {
            PseudoCommand::Quit => {
                log::info!("Quit requested");
                self.shutdown();
            }
            PseudoCommand::CloseWindow => self.close_window(window),
            PseudoCommand::Print => self.frames.print(main_frame, PrintMode::Print),
            PseudoCommand::PrintPreview => self.frames.print(main_frame, PrintMode::Preview),
            PseudoCommand::Pdf => {
                match self.desktop.pick_save_file("Print to PDF", &start_dir) {
                    Some(mut path) => {
                        if path.extension().is_none() {
                            path.set_extension("pdf");
                        }
                        self.frames.print(main_frame, PrintMode::Pdf(path));
                    }
                    None => log::info!("PDF export cancelled"),
                }
            }
            PseudoCommand::OpenFile => {
                let picked = self.desktop.pick_file("Select File", &start_dir);
                self.set_signal(window, picked, "File selected", |signals, path| {
                    signals.file_to_open = Some(path)
                });
            }
            PseudoCommand::NewFile => {
                let picked = self.desktop.pick_save_file("New File Name", &start_dir);
                self.set_signal(window, picked, "New file name selected", |signals, path| {
                    signals.file_to_create = Some(path)
                });
            }
            PseudoCommand::OpenFolder => {
                let picked = self.desktop.pick_folder("Select Directory", &start_dir);
                self.set_signal(window, picked, "Folder selected", |signals, path| {
                    signals.folder_to_open = Some(path)
                });
            }
            PseudoCommand::SelectTheme => {
                let themes = self.themes.list().map_err(|source| ShellError::Theme {
                    name: self.themes.dir().display().to_string(),
                    source,
                })?;
                let page = self.themes.selection_page(&themes);
                self.frames.set_html(origin, &page);
            }
            PseudoCommand::SetTheme(name) => {
                self.themes
                    .apply(&name)
                    .map_err(|source| ShellError::Theme {
                        name: name.clone(),
                        source,
                    })?;
                self.settings
                    .update(SettingKey::Theme, &name)
                    .map_err(ShellError::SettingsUpdate)?;
                self.frames.clear_memory_caches();
                self.frames.reload(origin);
            }
            PseudoCommand::SelectInterpreter(key) => {
                let Some(setting) = SettingKey::for_interpreter(&key) else {
                    log::warn!("No interpreter setting for '{}'", key);
                    return Ok(());
                };
                let title = format!("Select {key} interpreter");
                let Some(path) = self.desktop.pick_file(&title, &start_dir) else {
                    log::info!("Interpreter selection cancelled");
                    return Ok(());
                };
                self.settings
                    .update(setting, &path.to_string_lossy())
                    .map_err(ShellError::SettingsUpdate)?;
                self.desktop
                    .notify("Interpreter selected", &path.display().to_string());
            }
            PseudoCommand::External(command) => {
                self.desktop
                    .launch(&command)
                    .map_err(|source| ShellError::External {
                        target: command.clone(),
                        source,
                    })?;
                self.desktop.notify("External application started", &command);
            }
            PseudoCommand::Settings { form } => {
                let message = match form {
                    Some(form) => match settings_page::apply_form(&mut self.settings, &form) {
                        Ok(keys) => {
                            log::info!("Settings page saved {} value(s)", keys.len());
                            Some("Settings saved.".to_string())
                        }
                        Err(e) => {
                            log::warn!("Settings page update failed: {}", e);
                            Some(format!("Settings not saved: {e}"))
                        }
                    },
                    None => None,
                };
                let page = settings_page::render(self.settings.current(), message.as_deref());
                self.frames.set_html(origin, &page);
            }
        }
        Ok(())
    }

    /// Store a picker result as a one-shot signal for the window's next script.
    fn set_signal(
        &mut self,
        window: WindowId,
        picked: Option<PathBuf>,
        notice: &str,
        apply: impl FnOnce(&mut peb_scripting::PendingSignals, PathBuf),
    ) {
        let Some(path) = picked else {
            log::info!("Selection cancelled");
            return;
        };
        let Some(state) = self.windows.get_mut(&window) else {
            return;
        };
        let shown = path.display().to_string();
        apply(state.pipeline.signals_mut(), path);
        self.desktop.notify(notice, &shown);
    }

    fn delegate(&mut self, url: &Url) {
        let target = match url.scheme() {
            "file" => url
                .to_file_path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|_| url.to_string()),
            _ => url.to_string(),
        };
        match self.desktop.open_url(&target) {
            Ok(()) => {
                log::info!("Opened {} with the system handler", target);
                self.desktop.notify("External browser called", &target);
            }
            Err(source) => self.report(&ShellError::External { target, source }),
        }
    }

    fn debugger_command(
        &mut self,
        action: DebuggerAction,
        script: Option<PathBuf>,
        origin: FrameRef,
    ) -> Result<(), RunError> {
        let Self {
            windows,
            config,
            settings,
            desktop,
            ..
        } = self;
        let Some(window) = windows.get_mut(&origin.window) else {
            return Ok(());
        };
        let bridge = &mut window.debugger;
        let slots = &mut window.slots;
        let settings = settings.current();

        match action {
            DebuggerAction::SelectFile => {
                let script = match script {
                    Some(script) => Some(script),
                    None => desktop.pick_file("Select Perl File", &config.root_dir()),
                };
                match script {
                    Some(script) => {
                        bridge.start(config, settings, &script, origin, slots)?;
                    }
                    None => log::info!("Debugger target selection cancelled"),
                }
            }
            DebuggerAction::Restart => {
                bridge.restart(config, settings, slots)?;
            }
            DebuggerAction::Command(command) => {
                if let Some(script) = script {
                    let same_target = bridge.state().script_to_debug.as_ref() == Some(&script);
                    if bridge.session().is_none() || !same_target {
                        bridge.start(config, settings, &script, origin, slots)?;
                    }
                }
                bridge.submit(&command, slots)?;
            }
        }
        Ok(())
    }
}

//! URL classification.
//!
//! [`Classifier::classify`] maps a [`NavigationRequest`] onto exactly one
//! [`ClassifiedAction`]. It is pure: it reads the request and the static
//! configuration (plus a file-existence check for `file:` URLs) and never
//! spawns, prompts or writes anything.
//!
//! Decision order, first match wins:
//!
//! 1. pseudo-command (`quit:`, `http://<pseudo-domain>/print`, `about:config`, ...)
//! 2. debugger function path on the pseudo-domain
//! 3. script extension on the pseudo-domain (empty form submissions excluded)
//! 4. static extension on the pseudo-domain
//! 5. allowed remote domain
//! 6. any other `http(s)` URL
//! 7. `file:` URL
//! 8. everything else is rejected

use super::action::{ClassifiedAction, DebuggerAction, PseudoCommand};
use super::request::{NavigationRequest, NavigationTrigger};
use peb_config::Config;
use peb_scripting::RequestMethod;
use percent_encoding::percent_decode_str;
use std::path::Path;
use url::Url;

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

fn extension_of(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

pub struct Classifier<'a> {
    config: &'a Config,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn is_local(&self, url: &Url) -> bool {
        is_http(url)
            && url
                .host_str()
                .is_some_and(|host| self.config.network.is_pseudo_domain(host))
    }

    pub fn classify(&self, request: &NavigationRequest) -> ClassifiedAction {
        let url = &request.url;

        if let Some(command) = self.pseudo_command(request) {
            return ClassifiedAction::RunPseudoCommand(command);
        }

        let local = self.is_local(url);
        let path = decode(url.path());

        if local && let Some(action) = self.debugger_command(url, &path) {
            return action;
        }

        if local && let Some(extension) = extension_of(&path) {
            let scripts = &self.config.scripts;
            if scripts.is_script_extension(extension) {
                let empty_form = request.trigger == NavigationTrigger::FormSubmit
                    && request.form_content().is_empty();
                if !empty_form {
                    return ClassifiedAction::RunScript {
                        path: self.config.local_path(&path),
                        query: request.query().to_string(),
                        post_body: match request.method {
                            RequestMethod::Post => request.body.clone(),
                            RequestMethod::Get => None,
                        },
                        method: request.method,
                        long_running: scripts.is_long_running(&path),
                    };
                }
                log::warn!("Empty form submitted to {}, not running it", url);
            } else if scripts.is_static_extension(extension) {
                return ClassifiedAction::LoadLocalFile {
                    path: self.config.local_path(&path),
                };
            }
        }

        if is_http(url)
            && let Some(host) = url.host_str()
            && self.config.network.is_allowed_domain(host)
        {
            return if request.is_child_frame {
                ClassifiedAction::OpenRemoteInSameWindow { url: url.clone() }
            } else {
                ClassifiedAction::OpenRemoteInNewWindow { url: url.clone() }
            };
        }

        if is_http(url) && !local {
            return ClassifiedAction::DelegateToSystemBrowser { url: url.clone() };
        }

        if url.scheme() == "file"
            && let Ok(file) = url.to_file_path()
        {
            return if file.exists() {
                ClassifiedAction::DelegateToSystemBrowser { url: url.clone() }
            } else {
                ClassifiedAction::MissingFile { path: file }
            };
        }

        ClassifiedAction::Reject
    }

    /// Scheme form (`print:`, `settheme:dark`, `about:config`) or single-segment
    /// path form on the pseudo-domain (`/print`, `/settheme?dark`).
    fn pseudo_command(&self, request: &NavigationRequest) -> Option<PseudoCommand> {
        let url = &request.url;
        if url.scheme() == "about" && url.path() == "config" {
            let form = request.form_content();
            return Some(PseudoCommand::Settings {
                form: (!form.is_empty()).then(|| form.to_string()),
            });
        }
        if url.cannot_be_a_base() {
            return PseudoCommand::parse(url.scheme(), &decode(url.path()));
        }
        if !self.is_local(url) {
            return None;
        }
        let name = url.path().strip_prefix('/')?;
        if name.is_empty() || name.contains(['/', '.']) {
            return None;
        }
        PseudoCommand::parse(&decode(name), &decode(url.query().unwrap_or("")))
    }

    fn debugger_command(&self, url: &Url, path: &str) -> Option<ClassifiedAction> {
        let function = path.strip_prefix('/')?;
        if function != self.config.debugger.function_name {
            return None;
        }

        let mut command = None;
        let mut requested = None;
        let mut script = None;
        for (key, value) in url.query_pairs() {
            match &*key {
                "command" if !value.trim().is_empty() => command = Some(value.into_owned()),
                "action" => requested = Some(value.into_owned()),
                "script" if !value.is_empty() => script = Some(self.config.local_path(&value)),
                _ => {}
            }
        }

        let action = match (command, requested.as_deref()) {
            (Some(command), _) => DebuggerAction::Command(command),
            (None, Some("restart")) => DebuggerAction::Restart,
            _ => DebuggerAction::SelectFile,
        };
        Some(ClassifiedAction::DebuggerCommand { action, script })
    }
}

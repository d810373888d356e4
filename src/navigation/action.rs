//! Classification results.

use peb_scripting::RequestMethod;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Commands addressed to the shell itself rather than to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoCommand {
    Quit,
    CloseWindow,
    Print,
    PrintPreview,
    Pdf,
    OpenFile,
    NewFile,
    OpenFolder,
    SelectTheme,
    SetTheme(String),
    /// Pick a new binary for the interpreter key (`perl`, `python`, `php`).
    SelectInterpreter(String),
    /// Launch an external application.
    External(String),
    /// The settings page; `form` holds submitted values, if any.
    Settings { form: Option<String> },
}

impl PseudoCommand {
    /// Parse a command name and its (decoded) argument.
    pub fn parse(name: &str, args: &str) -> Option<Self> {
        let command = match name.to_ascii_lowercase().as_str() {
            "quit" => PseudoCommand::Quit,
            "closewindow" => PseudoCommand::CloseWindow,
            "print" => PseudoCommand::Print,
            "printpreview" => PseudoCommand::PrintPreview,
            "pdf" => PseudoCommand::Pdf,
            "openfile" => PseudoCommand::OpenFile,
            "newfile" => PseudoCommand::NewFile,
            "openfolder" => PseudoCommand::OpenFolder,
            "selecttheme" => PseudoCommand::SelectTheme,
            "settheme" => PseudoCommand::SetTheme(args.to_string()),
            "selectperl" => PseudoCommand::SelectInterpreter("perl".to_string()),
            "selectpython" => PseudoCommand::SelectInterpreter("python".to_string()),
            "selectphp" => PseudoCommand::SelectInterpreter("php".to_string()),
            "external" => PseudoCommand::External(args.to_string()),
            _ => return None,
        };
        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PseudoCommand::Quit => "quit",
            PseudoCommand::CloseWindow => "closewindow",
            PseudoCommand::Print => "print",
            PseudoCommand::PrintPreview => "printpreview",
            PseudoCommand::Pdf => "pdf",
            PseudoCommand::OpenFile => "openfile",
            PseudoCommand::NewFile => "newfile",
            PseudoCommand::OpenFolder => "openfolder",
            PseudoCommand::SelectTheme => "selecttheme",
            PseudoCommand::SetTheme(_) => "settheme",
            PseudoCommand::SelectInterpreter(_) => "selectinterpreter",
            PseudoCommand::External(_) => "external",
            PseudoCommand::Settings { .. } => "about:config",
        }
    }
}

/// What the debugger function path asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerAction {
    /// Choose the script to debug with a file picker.
    SelectFile,
    /// Start over with the current script.
    Restart,
    /// Send a line command to the running debugger.
    Command(String),
}

/// The decision for one navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedAction {
    RunScript {
        path: PathBuf,
        query: String,
        post_body: Option<String>,
        method: RequestMethod,
        long_running: bool,
    },
    LoadLocalFile {
        path: PathBuf,
    },
    RunPseudoCommand(PseudoCommand),
    OpenRemoteInSameWindow {
        url: Url,
    },
    OpenRemoteInNewWindow {
        url: Url,
    },
    DelegateToSystemBrowser {
        url: Url,
    },
    DebuggerCommand {
        action: DebuggerAction,
        script: Option<PathBuf>,
    },
    /// A `file:` URL whose target does not exist.
    MissingFile {
        path: PathBuf,
    },
    /// Not intercepted; the renderer handles it.
    Reject,
}

impl ClassifiedAction {
    /// Whether the renderer's default navigation should proceed.
    pub fn proceeds(&self) -> bool {
        matches!(self, ClassifiedAction::Reject)
    }
}

impl fmt::Display for ClassifiedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifiedAction::RunScript {
                path, long_running, ..
            } => {
                if *long_running {
                    write!(f, "run long-running script {}", path.display())
                } else {
                    write!(f, "run script {}", path.display())
                }
            }
            ClassifiedAction::LoadLocalFile { path } => write!(f, "load {}", path.display()),
            ClassifiedAction::RunPseudoCommand(command) => {
                write!(f, "pseudo-command {}", command.name())
            }
            ClassifiedAction::OpenRemoteInSameWindow { url } => write!(f, "allowed link {}", url),
            ClassifiedAction::OpenRemoteInNewWindow { url } => {
                write!(f, "allowed link {} (new window)", url)
            }
            ClassifiedAction::DelegateToSystemBrowser { url } => {
                write!(f, "external browser for {}", url)
            }
            ClassifiedAction::DebuggerCommand { action, .. } => {
                write!(f, "debugger {:?}", action)
            }
            ClassifiedAction::MissingFile { path } => write!(f, "missing file {}", path.display()),
            ClassifiedAction::Reject => f.write_str("reject"),
        }
    }
}

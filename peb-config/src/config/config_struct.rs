//! Core `Config` struct definition.
//!
//! The settings document is split into sections that mirror the groups of
//! the settings file:
//!
//! | Section        | Struct               |
//! |----------------|----------------------|
//! | `root`         | [`RootConfig`]       |
//! | `gui`          | [`GuiConfig`]        |
//! | `network`      | [`NetworkConfig`]    |
//! | `scripts`      | [`ScriptsConfig`]    |
//! | `interpreters` | [`InterpreterConfig`]|
//! | `environment`  | [`EnvironmentConfig`]|
//! | `debugger`     | [`DebuggerConfig`]   |
//! | `logging`      | [`LoggingConfig`]    |

use crate::types::{LogLevel, LogMode, WindowSize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application root and start page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    /// Directory holding the local pages and scripts, relative to the
    /// settings file unless absolute.
    #[serde(default = "crate::defaults::root_directory")]
    pub directory: String,

    /// Page loaded into the first window, relative to `directory`.
    #[serde(default = "crate::defaults::start_page")]
    pub start_page: String,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            directory: crate::defaults::root_directory(),
            start_page: crate::defaults::start_page(),
        }
    }
}

/// Window chrome settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiConfig {
    #[serde(default = "crate::defaults::icon")]
    pub icon: String,

    #[serde(default)]
    pub window_size: WindowSize,

    #[serde(default = "crate::defaults::bool_false")]
    pub frameless_window: bool,

    #[serde(default = "crate::defaults::bool_false")]
    pub stay_on_top: bool,

    /// Window title; `dynamic` follows the loaded page's `<title>`.
    #[serde(default = "crate::defaults::browser_title")]
    pub browser_title: String,

    #[serde(default = "crate::defaults::bool_true")]
    pub context_menu: bool,

    /// Name of the active theme (a `.css` file in `themes_directory`).
    #[serde(default = "crate::defaults::theme")]
    pub theme: String,

    #[serde(default = "crate::defaults::themes_directory")]
    pub themes_directory: String,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            icon: crate::defaults::icon(),
            window_size: WindowSize::default(),
            frameless_window: false,
            stay_on_top: false,
            browser_title: crate::defaults::browser_title(),
            context_menu: true,
            theme: crate::defaults::theme(),
            themes_directory: crate::defaults::themes_directory(),
        }
    }
}

impl GuiConfig {
    pub fn has_dynamic_title(&self) -> bool {
        self.browser_title == "dynamic"
    }
}

/// Pseudo-domain and remote allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Non-routable host name that marks a URL as local to the application.
    #[serde(default = "crate::defaults::pseudo_domain")]
    pub pseudo_domain: String,

    /// Remote hosts that may be displayed inside the application.
    #[serde(default = "crate::defaults::allowed_domains")]
    pub allowed_domains: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            pseudo_domain: crate::defaults::pseudo_domain(),
            allowed_domains: crate::defaults::allowed_domains(),
        }
    }
}

impl NetworkConfig {
    pub fn is_pseudo_domain(&self, host: &str) -> bool {
        host.eq_ignore_ascii_case(&self.pseudo_domain)
    }

    pub fn is_allowed_domain(&self, host: &str) -> bool {
        self.allowed_domains
            .iter()
            .any(|domain| domain.eq_ignore_ascii_case(host))
    }
}

/// Which local files are scripts and how they execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Lower-case extension → interpreter key in [`InterpreterConfig`].
    #[serde(default = "crate::defaults::script_extensions")]
    pub extensions: BTreeMap<String, String>,

    /// Extensions loaded directly into a frame.
    #[serde(default = "crate::defaults::static_extensions")]
    pub static_extensions: Vec<String>,

    /// Path fragment that turns a script into a long-running one.
    #[serde(default = "crate::defaults::long_running_marker")]
    pub long_running_marker: String,

    #[serde(default = "crate::defaults::script_timeout_secs")]
    pub timeout_secs: u64,

    /// Capture stderr of blocking scripts into a file instead of discarding it.
    #[serde(default = "crate::defaults::bool_true")]
    pub display_stderr: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            extensions: crate::defaults::script_extensions(),
            static_extensions: crate::defaults::static_extensions(),
            long_running_marker: crate::defaults::long_running_marker(),
            timeout_secs: crate::defaults::script_timeout_secs(),
            display_stderr: true,
        }
    }
}

impl ScriptsConfig {
    /// Interpreter key for a script extension, compared case-insensitively.
    pub fn interpreter_key(&self, extension: &str) -> Option<&str> {
        let extension = extension.to_ascii_lowercase();
        self.extensions.get(&extension).map(String::as_str)
    }

    pub fn is_script_extension(&self, extension: &str) -> bool {
        self.interpreter_key(extension).is_some()
    }

    pub fn is_static_extension(&self, extension: &str) -> bool {
        self.static_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    pub fn is_long_running(&self, path: &str) -> bool {
        !self.long_running_marker.is_empty() && path.contains(&self.long_running_marker)
    }
}

/// Interpreter binaries, by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    #[serde(default = "crate::defaults::perl_interpreter")]
    pub perl: String,

    #[serde(default = "crate::defaults::python_interpreter")]
    pub python: String,

    #[serde(default = "crate::defaults::php_interpreter")]
    pub php: String,

    /// Interpreters for keys beyond the three built-in languages.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            perl: crate::defaults::perl_interpreter(),
            python: crate::defaults::python_interpreter(),
            php: crate::defaults::php_interpreter(),
            extra: BTreeMap::new(),
        }
    }
}

impl InterpreterConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "perl" => Some(self.perl.as_str()),
            "python" => Some(self.python.as_str()),
            "php" => Some(self.php.as_str()),
            other => self.extra.get(other).map(String::as_str),
        }
    }
}

/// What a spawned script may see of the process environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Variable names allowed through to scripts.
    #[serde(default = "crate::defaults::allowed_env_vars")]
    pub allowed: Vec<String>,

    /// Directories (relative to the root unless absolute) appended to the
    /// inherited search path.
    #[serde(default = "crate::defaults::path_additions")]
    pub path_additions: Vec<String>,

    /// Interpreter library variable, e.g. `PERL5LIB` or `PYTHONPATH`.
    #[serde(default = "crate::defaults::lib_variable")]
    pub lib_variable: String,

    /// Library directory, relative to the root unless absolute.
    #[serde(default = "crate::defaults::lib_path")]
    pub lib_path: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            allowed: crate::defaults::allowed_env_vars(),
            path_additions: crate::defaults::path_additions(),
            lib_variable: crate::defaults::lib_variable(),
            lib_path: crate::defaults::lib_path(),
        }
    }
}

/// Interactive line-debugger bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Path on the pseudo-domain that addresses the debugger.
    #[serde(default = "crate::defaults::debugger_function_name")]
    pub function_name: String,

    /// Interpreter key used to run the debugger.
    #[serde(default = "crate::defaults::debugger_interpreter")]
    pub interpreter: String,

    #[serde(default = "crate::defaults::debugger_interpreter_args")]
    pub interpreter_args: Vec<String>,

    /// Syntax-highlighting formatter script, run as `<formatter> <source> <line>`.
    /// When unset the built-in listing is used.
    #[serde(default)]
    pub formatter: Option<String>,

    #[serde(default = "crate::defaults::debugger_prompt_pattern")]
    pub prompt_pattern: String,

    #[serde(default = "crate::defaults::debugger_location_pattern")]
    pub location_pattern: String,

    /// Extra variables set for the debugger process only.
    #[serde(default = "crate::defaults::debugger_environment")]
    pub environment: BTreeMap<String, String>,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            function_name: crate::defaults::debugger_function_name(),
            interpreter: crate::defaults::debugger_interpreter(),
            interpreter_args: crate::defaults::debugger_interpreter_args(),
            formatter: None,
            prompt_pattern: crate::defaults::debugger_prompt_pattern(),
            location_pattern: crate::defaults::debugger_location_pattern(),
            environment: crate::defaults::debugger_environment(),
        }
    }
}

/// Log file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub mode: LogMode,

    #[serde(default = "crate::defaults::log_prefix")]
    pub prefix: String,

    /// Relative to the settings file unless absolute.
    #[serde(default = "crate::defaults::log_directory")]
    pub directory: String,

    #[serde(default)]
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            mode: LogMode::default(),
            prefix: crate::defaults::log_prefix(),
            directory: crate::defaults::log_directory(),
            level: LogLevel::default(),
        }
    }
}

/// The whole settings document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub root: RootConfig,

    #[serde(default)]
    pub gui: GuiConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub interpreters: InterpreterConfig,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub debugger: DebuggerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory relative paths resolve against; the settings file's directory.
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// File this document was loaded from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used mainly by tests and embedders.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_pseudo_domain(mut self, domain: impl Into<String>) -> Self {
        self.network.pseudo_domain = domain.into();
        self
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base_dir.join(candidate)
        }
    }

    /// Absolute directory that local URLs map onto.
    pub fn root_dir(&self) -> PathBuf {
        self.resolve(&self.root.directory)
    }

    /// Map a URL path (`/cgi/hello.pl`) onto a file below the root directory.
    pub fn local_path(&self, url_path: &str) -> PathBuf {
        let relative = url_path.trim_start_matches('/');
        if relative.is_empty() {
            self.root_dir()
        } else {
            self.root_dir().join(relative)
        }
    }

    pub fn start_page_path(&self) -> PathBuf {
        self.local_path(&self.root.start_page)
    }

    pub fn themes_dir(&self) -> PathBuf {
        let dir = Path::new(&self.gui.themes_directory);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root_dir().join(dir)
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.directory)
    }

    /// Resolve a root-relative setting such as `lib_path` or a path addition.
    pub fn root_relative(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root_dir().join(candidate)
        }
    }
}

//! Runtime-writable settings.
//!
//! The [`Config`] document is read once at startup and then treated as
//! immutable. The handful of values the settings page may change live in a
//! [`SettingsStore`], which applies every [`SettingsStore::update`] to its
//! in-memory [`RuntimeSettings`] and writes the whole document back to the
//! file it came from.

use crate::config::{Config, InterpreterConfig};
use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// The writable subset of the settings document.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    /// Interpreter per language key, as paths or bare names.
    pub interpreters: InterpreterConfig,
    /// Library directory exported to scripts, relative to the root.
    pub lib_path: String,
    /// Directories appended to the scripts' search path.
    pub path_additions: Vec<String>,
    /// External debugger source formatter, or the built-in listing.
    pub debug_formatter: Option<String>,
    /// Stylesheet currently copied to `current.css`.
    pub theme: String,
}

impl RuntimeSettings {
    fn from_config(config: &Config) -> Self {
        Self {
            interpreters: config.interpreters.clone(),
            lib_path: config.environment.lib_path.clone(),
            path_additions: config.environment.path_additions.clone(),
            debug_formatter: config.debugger.formatter.clone(),
            theme: config.gui.theme.clone(),
        }
    }

    fn write_into(&self, config: &mut Config) {
        config.interpreters = self.interpreters.clone();
        config.environment.lib_path = self.lib_path.clone();
        config.environment.path_additions = self.path_additions.clone();
        config.debugger.formatter = self.debug_formatter.clone();
        config.gui.theme = self.theme.clone();
    }
}

/// Keys accepted by [`SettingsStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    PerlInterpreter,
    PythonInterpreter,
    PhpInterpreter,
    LibPath,
    PathAdditions,
    DebugFormatter,
    Theme,
}

impl SettingKey {
    pub const ALL: [SettingKey; 7] = [
        SettingKey::PerlInterpreter,
        SettingKey::PythonInterpreter,
        SettingKey::PhpInterpreter,
        SettingKey::LibPath,
        SettingKey::PathAdditions,
        SettingKey::DebugFormatter,
        SettingKey::Theme,
    ];

    /// Dotted name as it appears in the settings file and on the settings form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::PerlInterpreter => "interpreters.perl",
            SettingKey::PythonInterpreter => "interpreters.python",
            SettingKey::PhpInterpreter => "interpreters.php",
            SettingKey::LibPath => "environment.lib_path",
            SettingKey::PathAdditions => "environment.path_additions",
            SettingKey::DebugFormatter => "debugger.formatter",
            SettingKey::Theme => "gui.theme",
        }
    }

    /// Interpreter key for the `select<lang>` pseudo-commands.
    pub fn for_interpreter(key: &str) -> Option<Self> {
        match key {
            "perl" => Some(SettingKey::PerlInterpreter),
            "python" => Some(SettingKey::PythonInterpreter),
            "php" => Some(SettingKey::PhpInterpreter),
            _ => None,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownSetting(s.to_string()))
    }
}

/// Split a PATH-additions value typed into the settings form.
///
/// Entries may be separated by newlines or `;`; blanks are dropped.
pub fn parse_path_list(value: &str) -> Vec<String> {
    value
        .split(['\n', ';'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

/// Mutable settings service injected into the components that need it.
#[derive(Debug)]
pub struct SettingsStore {
    document: Config,
    current: RuntimeSettings,
    persist: bool,
}

impl SettingsStore {
    /// Store backed by the document's source file.
    pub fn new(config: &Config) -> Self {
        Self {
            current: RuntimeSettings::from_config(config),
            persist: config.source_path.is_some(),
            document: config.clone(),
        }
    }

    /// Store that never touches the disk.
    pub fn in_memory(config: &Config) -> Self {
        Self {
            persist: false,
            ..Self::new(config)
        }
    }

    pub fn current(&self) -> &RuntimeSettings {
        &self.current
    }

    /// Apply one setting and persist the document.
    ///
    /// On a failed write the in-memory value is rolled back so the store
    /// never reports a value the file does not hold.
    pub fn update(&mut self, key: SettingKey, value: &str) -> Result<(), ConfigError> {
        let previous = self.current.clone();
        let value = value.trim();

        match key {
            SettingKey::PerlInterpreter => self.current.interpreters.perl = value.to_string(),
            SettingKey::PythonInterpreter => self.current.interpreters.python = value.to_string(),
            SettingKey::PhpInterpreter => self.current.interpreters.php = value.to_string(),
            SettingKey::LibPath => self.current.lib_path = value.to_string(),
            SettingKey::PathAdditions => self.current.path_additions = parse_path_list(value),
            SettingKey::DebugFormatter => {
                self.current.debug_formatter = (!value.is_empty()).then(|| value.to_string())
            }
            SettingKey::Theme => {
                if value.is_empty() {
                    return Err(ConfigError::Validation("theme name is empty".to_string()));
                }
                self.current.theme = value.to_string()
            }
        }

        if self.current == previous {
            return Ok(());
        }
        log::info!("Setting {} updated", key);

        if self.persist {
            self.current.write_into(&mut self.document);
            if let Err(e) = self.document.save() {
                log::error!("Failed to persist setting {}: {}", key, e);
                self.current = previous;
                self.current.write_into(&mut self.document);
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_keys_round_trip_through_names() {
        for key in SettingKey::ALL {
            assert_eq!(key.as_str().parse::<SettingKey>().ok(), Some(key));
        }
        assert!("gui.window_size".parse::<SettingKey>().is_err());
    }

    #[test]
    fn path_list_accepts_newlines_and_semicolons() {
        assert_eq!(
            parse_path_list("perl/bin;\n /opt/tools \n\n;x"),
            vec!["perl/bin", "/opt/tools", "x"]
        );
    }

    #[test]
    fn in_memory_update_changes_current_view() {
        let mut store = SettingsStore::in_memory(&Config::default());
        store
            .update(SettingKey::PerlInterpreter, "/opt/perl/bin/perl")
            .unwrap();
        assert_eq!(store.current().interpreters.perl, "/opt/perl/bin/perl");

        store.update(SettingKey::DebugFormatter, "  ").unwrap();
        assert_eq!(store.current().debug_formatter, None);
    }
}

//! CGI-style environment construction for spawned scripts.
//!
//! A child never inherits the shell's environment wholesale: the process
//! runner clears it and installs exactly the [`ScriptEnvironment`] built
//! here, which contains allow-listed names plus the per-request variables.

use peb_config::config::{PER_REQUEST_VARS, filter_allowed, is_env_var_allowed};
use peb_config::{Config, RuntimeSettings};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// HTTP method reported to the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => f.write_str("GET"),
            RequestMethod::Post => f.write_str("POST"),
        }
    }
}

/// One-shot values set by file and folder picker pseudo-commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSignals {
    pub file_to_open: Option<PathBuf>,
    pub folder_to_open: Option<PathBuf>,
    pub file_to_create: Option<PathBuf>,
}

impl PendingSignals {
    pub fn is_empty(&self) -> bool {
        self.file_to_open.is_none()
            && self.folder_to_open.is_none()
            && self.file_to_create.is_none()
    }

    /// Consume the signals, leaving them cleared.
    pub fn take(&mut self) -> PendingSignals {
        std::mem::take(self)
    }

    fn apply(&self, env: &mut ScriptEnvironment) {
        let pairs = [
            ("FILE_TO_OPEN", &self.file_to_open),
            ("FOLDER_TO_OPEN", &self.folder_to_open),
            ("FILE_TO_CREATE", &self.file_to_create),
        ];
        for (name, value) in pairs {
            if let Some(path) = value {
                env.vars
                    .insert(name.to_string(), path.to_string_lossy().into_owned());
            }
        }
    }
}

/// Per-request inputs to environment construction.
#[derive(Debug, Clone, Default)]
pub struct RequestVars<'a> {
    pub method: RequestMethod,
    pub query: &'a str,
    pub content_length: Option<usize>,
}

/// Variable name → value handed to a child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptEnvironment {
    vars: BTreeMap<String, String>,
}

impl ScriptEnvironment {
    /// Snapshot of the shell's own environment. Entries that are not valid
    /// UTF-8 are skipped.
    pub fn host_vars() -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v): (OsString, OsString)| {
                Some((k.into_string().ok()?, v.into_string().ok()?))
            })
            .collect()
    }

    /// Keep only the allow-listed entries of `host`.
    pub fn from_allowed<I>(host: I, allowed: &[String]) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars = filter_allowed(host, allowed).into_iter().collect();
        Self { vars }
    }

    /// Build the environment for one script invocation.
    ///
    /// Constructed values (`DOCUMENT_ROOT`, the library variable, the
    /// extended search path) are only installed when their name is on the
    /// allow-list.
    pub fn for_request<I>(
        config: &Config,
        settings: &RuntimeSettings,
        host: I,
        request: &RequestVars<'_>,
        signals: &PendingSignals,
    ) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let allowed = &config.environment.allowed;
        let mut env = Self::from_allowed(host, allowed);

        env.set_if_allowed(
            "DOCUMENT_ROOT",
            config.root_dir().to_string_lossy().into_owned(),
            allowed,
        );
        env.set_if_allowed(
            &config.environment.lib_variable,
            config
                .root_relative(&settings.lib_path)
                .to_string_lossy()
                .into_owned(),
            allowed,
        );

        let path_var = peb_config::defaults::path_variable();
        let additions: Vec<PathBuf> = settings
            .path_additions
            .iter()
            .map(|entry| config.root_relative(entry))
            .collect();
        env.append_search_path(&path_var, &additions, allowed);

        env.vars
            .insert("REQUEST_METHOD".to_string(), request.method.to_string());
        env.vars
            .insert("QUERY_STRING".to_string(), request.query.to_string());
        if let Some(length) = request.content_length {
            env.vars
                .insert("CONTENT_LENGTH".to_string(), length.to_string());
        }
        signals.apply(&mut env);

        debug_assert!(
            env.vars
                .keys()
                .all(|k| is_env_var_allowed(k, allowed) || PER_REQUEST_VARS.contains(&k.as_str()))
        );
        env
    }

    fn set_if_allowed(&mut self, name: &str, value: String, allowed: &[String]) {
        if is_env_var_allowed(name, allowed) {
            self.vars.insert(name.to_string(), value);
        } else {
            log::debug!("{} withheld from script environment: not allow-listed", name);
        }
    }

    /// Append directories to the search path variable, keeping inherited entries first.
    fn append_search_path(&mut self, var: &str, dirs: &[PathBuf], allowed: &[String]) {
        if dirs.is_empty() || !is_env_var_allowed(var, allowed) {
            return;
        }
        let mut entries: Vec<PathBuf> = self
            .vars
            .get(var)
            .map(|current| std::env::split_paths(current).collect())
            .unwrap_or_default();
        entries.extend(dirs.iter().cloned());
        match std::env::join_paths(entries) {
            Ok(joined) => {
                self.vars
                    .insert(var.to_string(), joined.to_string_lossy().into_owned());
            }
            Err(e) => log::warn!("Cannot extend {}: {}", var, e),
        }
    }

    /// Add a session-specific variable, e.g. debugger options.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.vars.keys().map(String::as_str).collect()
    }

    /// Search path entries as seen by the child.
    pub fn search_path(&self) -> Option<OsString> {
        self.get(&peb_config::defaults::path_variable())
            .map(OsString::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_noise() -> Vec<(String, String)> {
        let mut host: Vec<(String, String)> = (0..40)
            .map(|i| (format!("NOISE_{i}"), format!("value-{i}")))
            .collect();
        host.push((peb_config::defaults::path_variable(), "/usr/bin".to_string()));
        host.push(("HOME".to_string(), "/home/ada".to_string()));
        host.push(("QUERY_STRING".to_string(), "leaked=1".to_string()));
        host
    }

    #[test]
    fn child_sees_only_allowed_and_request_vars() {
        let config = Config::default().with_base_dir("/srv/app");
        let settings = peb_config::SettingsStore::in_memory(&config)
            .current()
            .clone();
        let request = RequestVars {
            method: RequestMethod::Get,
            query: "name=Ada",
            content_length: None,
        };

        let env = ScriptEnvironment::for_request(
            &config,
            &settings,
            host_with_noise(),
            &request,
            &PendingSignals::default(),
        );

        let mut names = env.names();
        names.sort();
        let path_var = peb_config::defaults::path_variable();
        let mut expected = vec![
            "DOCUMENT_ROOT",
            "PERL5LIB",
            path_var.as_str(),
            "QUERY_STRING",
            "REQUEST_METHOD",
        ];
        expected.sort();
        assert_eq!(names, expected);
        assert_eq!(env.get("QUERY_STRING"), Some("name=Ada"));
        assert_eq!(env.get("REQUEST_METHOD"), Some("GET"));
        assert!(!env.contains("HOME"));
    }

    #[test]
    fn from_allowed_drops_unlisted_host_vars() {
        let allowed = vec!["HOME".to_string()];
        let env = ScriptEnvironment::from_allowed(host_with_noise(), &allowed);
        assert_eq!(env.names(), vec!["HOME"]);
        assert_eq!(env.get("HOME"), Some("/home/ada"));
    }

    #[cfg(unix)]
    #[test]
    fn search_path_keeps_inherited_entries_first() {
        let config = Config::default().with_base_dir("/srv/app");
        let settings = peb_config::SettingsStore::in_memory(&config)
            .current()
            .clone();
        let env = ScriptEnvironment::for_request(
            &config,
            &settings,
            host_with_noise(),
            &RequestVars::default(),
            &PendingSignals::default(),
        );
        let path = env.search_path().unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(entries.first(), Some(&PathBuf::from("/usr/bin")));
        assert_eq!(
            entries.last(),
            Some(&PathBuf::from("/srv/app/./perl/bin"))
        );
    }

    #[test]
    fn pending_signals_are_exported_when_set() {
        let config = Config::default();
        let settings = peb_config::SettingsStore::in_memory(&config)
            .current()
            .clone();
        let signals = PendingSignals {
            file_to_open: Some(PathBuf::from("/tmp/report.csv")),
            ..PendingSignals::default()
        };
        let env = ScriptEnvironment::for_request(
            &config,
            &settings,
            Vec::new(),
            &RequestVars::default(),
            &signals,
        );
        assert_eq!(env.get("FILE_TO_OPEN"), Some("/tmp/report.csv"));
        assert!(!env.contains("FOLDER_TO_OPEN"));
    }
}

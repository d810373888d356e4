//! Config persistence and path resolution for `Config`.
//!
//! Covers:
//! - settings-file lookup (`--ini` override, executable directory, user config dir)
//! - `load_from` / `save` (YAML file I/O with atomic write)
//! - semantic validation of a freshly parsed document

use super::config_struct::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the settings file looked up next to the executable.
pub const SETTINGS_FILE_NAME: &str = "peb.yaml";

impl Config {
    /// Candidate settings-file locations, in lookup order.
    ///
    /// An explicit path (from `--ini`) is the only candidate when given.
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }

        let mut paths = Vec::new();
        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            paths.push(dir.join(SETTINGS_FILE_NAME));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("peb").join(SETTINGS_FILE_NAME));
        }
        paths
    }

    /// Load the first settings file found along [`Config::search_paths`].
    ///
    /// A missing file is an error: the shell cannot start without its root
    /// directory and start page.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let candidates = Self::search_paths(explicit);
        for candidate in &candidates {
            if candidate.is_file() {
                return Self::load_from(candidate);
            }
            log::debug!("Settings file not found at {:?}", candidate);
        }

        let reported = candidates
            .into_iter()
            .next()
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
        Err(ConfigError::Missing(reported))
    }

    /// Load and validate a specific settings file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        log::info!("Loading settings from {:?}", path);

        let contents = fs::read_to_string(path)?;
        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml_ng::from_str(&contents)?
        };

        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.source_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Save back to the file this document was loaded from.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.source_path.as_deref().ok_or_else(|| {
            ConfigError::Validation("settings were not loaded from a file".to_string())
        })?;
        self.save_to(path)
    }

    /// Atomic save: write to a temp file then rename over the target.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;
        fs::rename(&temp_path, path)?;
        log::debug!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Reject documents the navigation pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.pseudo_domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "network.pseudo_domain must not be empty".to_string(),
            ));
        }
        if self.scripts.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "scripts.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(ext) = self
            .scripts
            .extensions
            .keys()
            .find(|ext| ext.is_empty() || ext.starts_with('.') || *ext != &ext.to_ascii_lowercase())
        {
            return Err(ConfigError::Validation(format!(
                "scripts.extensions key '{ext}' must be a lower-case extension without a dot"
            )));
        }
        for (ext, key) in &self.scripts.extensions {
            if self.interpreters.get(key).is_none() {
                return Err(ConfigError::Validation(format!(
                    "scripts.extensions maps '{ext}' to unknown interpreter '{key}'"
                )));
            }
        }
        Ok(())
    }
}

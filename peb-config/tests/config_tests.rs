use peb_config::{Config, ConfigError, LogMode, SettingKey, SettingsStore, WindowSize};
use std::fs;
use tempfile::TempDir;

fn write_settings(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("peb.yaml");
    fs::write(&path, yaml).expect("Failed to write settings file");
    path
}

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.root.start_page, "index.htm");
    assert_eq!(
        config.network.pseudo_domain,
        "perl-executing-browser-pseudodomain"
    );
    assert_eq!(config.scripts.timeout_secs, 30);
    assert_eq!(config.scripts.long_running_marker, "longrun");
    assert_eq!(config.scripts.interpreter_key("pl"), Some("perl"));
    assert_eq!(config.scripts.interpreter_key("PY"), Some("python"));
    assert!(config.scripts.is_static_extension("HTML"));
    assert_eq!(config.logging.mode, LogMode::None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_minimal_file_loads_with_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_settings(
        &dir,
        r#"
root:
  directory: app
network:
  pseudo_domain: peb-domain
gui:
  window_size: 800x600
"#,
    );

    let config = Config::load_from(&path).expect("Failed to load settings");
    assert_eq!(config.network.pseudo_domain, "peb-domain");
    assert_eq!(config.root_dir(), dir.path().join("app"));
    assert_eq!(config.start_page_path(), dir.path().join("app/index.htm"));
    assert_eq!(
        config.gui.window_size,
        WindowSize::Fixed {
            width: 800,
            height: 600
        }
    );
    assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
}

#[test]
fn test_missing_file_is_reported() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("absent.yaml");
    match Config::load(Some(&path)) {
        Err(ConfigError::Missing(reported)) => assert_eq!(reported, path),
        other => panic!("Expected Missing error, got: {:?}", other),
    }
}

#[test]
fn test_invalid_yaml_is_a_parse_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_settings(&dir, "network: [unterminated");
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_extension_mapped_to_unknown_interpreter_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_settings(
        &dir,
        r#"
scripts:
  extensions:
    rb: ruby
"#,
    );
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_settings_store_update_persists_to_same_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_settings(&dir, "network:\n  pseudo_domain: peb-domain\n");
    let config = Config::load_from(&path).expect("Failed to load settings");

    let mut store = SettingsStore::new(&config);
    store
        .update(SettingKey::PerlInterpreter, "/opt/perl/bin/perl")
        .expect("Failed to update interpreter");
    store
        .update(SettingKey::PathAdditions, "perl/bin\n/opt/tools")
        .expect("Failed to update path additions");

    let reloaded = Config::load_from(&path).expect("Failed to reload settings");
    assert_eq!(reloaded.interpreters.perl, "/opt/perl/bin/perl");
    assert_eq!(
        reloaded.environment.path_additions,
        vec!["perl/bin".to_string(), "/opt/tools".to_string()]
    );
    // Untouched sections survive the rewrite.
    assert_eq!(reloaded.network.pseudo_domain, "peb-domain");
}

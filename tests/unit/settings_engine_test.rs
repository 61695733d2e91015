//! Unit tests for SettingsEngine persistence through the public API.

use browser_shell::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use browser_shell::types::errors::SettingsError;
use browser_shell::types::settings::ShellSettings;
use tempfile::TempDir;

fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir.path().join("settings.json");
    SettingsEngine::new(Some(path.to_string_lossy().to_string()))
}

#[test]
fn test_save_creates_file_with_defaults() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in_temp(&dir);
    engine.save().unwrap();

    let raw = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
    let parsed: ShellSettings = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, ShellSettings::default());
}

#[test]
fn test_save_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("settings.json");
    let engine = SettingsEngine::new(Some(path.to_string_lossy().to_string()));
    engine.save().unwrap();
    assert!(path.exists());
}

/// A new engine reading the same file must observe a change made by `set_value`.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("downloads.progress_interval_ms", serde_json::json!(250))
            .unwrap();
        engine
            .set_value("logging.level", serde_json::json!("browser_shell=debug"))
            .unwrap();
    }

    {
        let mut engine2 = engine_in_temp(&dir);
        let loaded = engine2.load().unwrap();
        assert_eq!(loaded.downloads.progress_interval_ms, 250);
        assert_eq!(loaded.logging.level, "browser_shell=debug");
    }
}

#[test]
fn test_download_dir_follows_directory_setting() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("incoming");
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    engine
        .set_value(
            "downloads.directory",
            serde_json::json!(target.to_string_lossy()),
        )
        .unwrap();
    assert_eq!(engine.download_dir(), target);

    // An empty directory falls back to the platform location.
    engine
        .set_value("downloads.directory", serde_json::json!(""))
        .unwrap();
    assert_ne!(engine.download_dir(), target);
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("downloads.user_agent", serde_json::json!("Custom/1.0"))
            .unwrap();
        assert_eq!(engine.get_settings().downloads.user_agent, "Custom/1.0");

        engine.reset().unwrap();
        assert_eq!(*engine.get_settings(), ShellSettings::default());
    }

    {
        let mut engine2 = engine_in_temp(&dir);
        let loaded = engine2.load().unwrap();
        assert_eq!(loaded, ShellSettings::default());
    }
}

#[test]
fn test_rejected_value_leaves_settings_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let err = engine
        .set_value("downloads.progress_interval_ms", serde_json::json!("fast"))
        .unwrap_err();
    assert!(matches!(err, SettingsError::InvalidValue(_)));
    assert_eq!(*engine.get_settings(), ShellSettings::default());
    assert!(!dir.path().join("settings.json").exists());
}

#[test]
fn test_unknown_nested_key_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let err = engine
        .set_value("downloads.mirror.host", serde_json::json!("x"))
        .unwrap_err();
    assert!(matches!(err, SettingsError::InvalidKey(_)));
    let err = engine.set_value("", serde_json::json!(1)).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidKey(_)));
}

#[test]
fn test_get_config_path_returns_override() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in_temp(&dir);
    assert!(engine.get_config_path().ends_with("settings.json"));
    assert!(engine
        .get_config_path()
        .starts_with(&*dir.path().to_string_lossy()));
}

//! Property-based tests for ShellSettings serialization round-trip.
//!
//! These tests verify that ShellSettings survive JSON serialization and a
//! save/load cycle through SettingsEngine for arbitrary valid inputs.

use browser_shell::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use browser_shell::types::settings::{DownloadSettings, LoggingSettings, ShellSettings};
use proptest::prelude::*;
use tempfile::TempDir;

fn arb_download_settings() -> impl Strategy<Value = DownloadSettings> {
    (
        proptest::option::of("/[a-zA-Z0-9_/ .-]{1,40}"),
        "[a-zA-Z][a-zA-Z0-9/. ()-]{0,40}",
        0u64..60_000,
    )
        .prop_map(|(directory, user_agent, progress_interval_ms)| DownloadSettings {
            directory,
            user_agent,
            progress_interval_ms,
        })
}

fn arb_logging_settings() -> impl Strategy<Value = LoggingSettings> {
    prop_oneof![
        Just("error"),
        Just("warn"),
        Just("info"),
        Just("debug"),
        Just("browser_shell=trace"),
    ]
    .prop_map(|level| LoggingSettings {
        level: level.to_string(),
    })
}

fn arb_shell_settings() -> impl Strategy<Value = ShellSettings> {
    (arb_download_settings(), arb_logging_settings())
        .prop_map(|(downloads, logging)| ShellSettings { downloads, logging })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn settings_json_roundtrip(settings in arb_shell_settings()) {
        let json = serde_json::to_string(&settings).expect("serialize");
        let back: ShellSettings = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(back, settings);
    }

    #[test]
    fn settings_survive_set_value_and_reload(settings in arb_shell_settings()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut engine = SettingsEngine::new(Some(path.clone()));
        engine.set_value("downloads.directory", serde_json::json!(settings.downloads.directory)).unwrap();
        engine.set_value("downloads.user_agent", serde_json::json!(settings.downloads.user_agent)).unwrap();
        engine
            .set_value("downloads.progress_interval_ms", serde_json::json!(settings.downloads.progress_interval_ms))
            .unwrap();
        engine.set_value("logging.level", serde_json::json!(settings.logging.level)).unwrap();

        let mut reloaded = SettingsEngine::new(Some(path));
        let loaded = reloaded.load().unwrap();
        prop_assert_eq!(loaded, settings);
    }
}

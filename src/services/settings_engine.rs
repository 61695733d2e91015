// Browser shell Settings Engine
// Loads, saves, updates and resets the download subsystem's settings.
// Settings are stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::ShellSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ShellSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ShellSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: ShellSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string()
        });

        Self {
            config_path,
            settings: ShellSettings::default(),
        }
    }

    /// Directory used for downloads that don't name an explicit filepath.
    pub fn download_dir(&self) -> PathBuf {
        match &self.settings.downloads.directory {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => platform::get_downloads_dir(),
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// A missing file yields defaults; a malformed one is a serialization error.
    fn load(&mut self) -> Result<ShellSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.settings = ShellSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        self.settings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// Updates one setting by dot-notation key and saves to disk.
    ///
    /// The key must already exist (`downloads.directory`,
    /// `downloads.progress_interval_ms`, `logging.level`, ...). The new value is
    /// validated by deserializing the whole settings tree.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut tree = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };

        let mut current = &mut tree;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            current = current.get_mut(part).ok_or_else(|| {
                SettingsError::InvalidKey(format!("Key '{}' not found in settings", key))
            })?;
        }

        match current {
            Value::Object(map) if map.contains_key(leaf) => {
                map.insert(leaf.to_string(), value);
            }
            _ => {
                return Err(SettingsError::InvalidKey(format!(
                    "Key '{}' not found in settings",
                    key
                )))
            }
        }

        self.settings = serde_json::from_value(tree).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.save()
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ShellSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}

//! App Core for the browser shell.
//!
//! Central struct holding the settings engine, the download registry and the
//! download manager, and managing their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::managers::download_manager::{DownloadConfig, DownloadManager, DownloadManagerTrait};
use crate::managers::download_registry::DownloadRegistry;
use crate::services::notification_sink::DownloadEventSink;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Central application struct.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub registry: Arc<DownloadRegistry>,
    pub download_manager: DownloadManager,
}

impl App {
    /// Creates a new App: loads settings and builds the download engine.
    ///
    /// Must be called from within a tokio runtime. A malformed settings file
    /// is reported and replaced by defaults rather than aborting startup.
    pub fn new(
        settings_path: Option<String>,
        sink: Arc<dyn DownloadEventSink>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings_engine = SettingsEngine::new(settings_path);
        if let Err(e) = settings_engine.load() {
            warn!("Using default settings: {}", e);
        }

        let registry = Arc::new(DownloadRegistry::new());
        let download_manager =
            DownloadManager::new(registry.clone(), sink, Self::download_config(&settings_engine))
                .map_err(|e| format!("DownloadManager init failed: {}", e))?;

        Ok(Self {
            settings_engine,
            registry,
            download_manager,
        })
    }

    /// Engine configuration derived from the current settings.
    pub fn download_config(settings_engine: &SettingsEngine) -> DownloadConfig {
        let downloads = &settings_engine.get_settings().downloads;
        DownloadConfig {
            download_dir: settings_engine.download_dir(),
            user_agent: downloads.user_agent.clone(),
            progress_interval: Duration::from_millis(downloads.progress_interval_ms),
        }
    }

    /// Re-reads settings that can change while transfers are running.
    pub fn apply_settings(&mut self) {
        let dir = self.settings_engine.download_dir();
        self.download_manager.set_download_dir(dir);
    }

    pub fn startup(&mut self) {
        info!(
            "Browser shell {} started (settings: {}, downloads: {})",
            env!("CARGO_PKG_VERSION"),
            self.settings_engine.get_config_path(),
            self.settings_engine.download_dir().display()
        );
    }

    /// Shutdown sequence: abort live transfers and clear the registry.
    pub fn shutdown(&mut self) {
        self.download_manager.cleanup();
    }
}

use serde::{Deserialize, Serialize};

/// Top-level settings container for the browser shell's download subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShellSettings {
    pub downloads: DownloadSettings,
    pub logging: LoggingSettings,
}

/// Download-related settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadSettings {
    /// Directory for downloads without an explicit filepath.
    /// `None` uses the platform downloads directory.
    pub directory: Option<String>,
    pub user_agent: String,
    /// Minimum milliseconds between progress notifications for one download.
    /// 0 emits on every received chunk.
    pub progress_interval_ms: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            directory: None,
            user_agent: format!("BrowserShell/{}", env!("CARGO_PKG_VERSION")),
            progress_interval_ms: 0,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `tracing_subscriber` filter directive, e.g. `info` or `browser_shell=debug`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

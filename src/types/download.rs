use serde::{Deserialize, Serialize};

/// Fallback filename when none can be derived from the URL.
pub const DEFAULT_FILENAME: &str = "download";

/// Status of a file download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Paused,
    Completed,
    Cancelled,
    Error,
}

impl DownloadStatus {
    /// Completed and cancelled downloads never change status again.
    pub fn is_final(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Cancelled)
    }
}

/// Caller input for starting a download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
            filepath: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_filepath(mut self, filepath: impl Into<String>) -> Self {
        self.filepath = Some(filepath.into());
        self
    }
}

/// Represents a file download with its progress and timing.
///
/// Times are epoch milliseconds; `total_pause_time` is a duration in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: u64,
    pub filename: String,
    pub url: String,
    pub filepath: String,
    pub size: u64,
    pub downloaded: u64,
    pub status: DownloadStatus,
    pub progress: f64,
    pub speed: f64,
    pub start_time: i64,
    pub pause_time: i64,
    pub total_pause_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadRecord {
    /// Creates a fresh `pending` record with no bytes transferred.
    pub fn new(id: u64, url: &str, filename: String, filepath: String, start_time: i64) -> Self {
        Self {
            id,
            filename,
            url: url.to_string(),
            filepath,
            size: 0,
            downloaded: 0,
            status: DownloadStatus::Pending,
            progress: 0.0,
            speed: 0.0,
            start_time,
            pause_time: 0,
            total_pause_time: 0,
            error: None,
        }
    }

    /// Recomputes `progress` and `speed` from the byte counters at time `now`.
    pub fn refresh_rates(&mut self, now: i64) {
        self.progress = if self.size > 0 {
            self.downloaded as f64 * 100.0 / self.size as f64
        } else {
            0.0
        };

        let elapsed_ms = now - self.start_time - self.total_pause_time;
        self.speed = if elapsed_ms > 0 {
            self.downloaded as f64 / (elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = DownloadStatus::Error;
        self.error = Some(message.into());
    }
}

/// Event pushed to the notification sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum DownloadEvent {
    #[serde(rename = "download:update")]
    Update(DownloadRecord),
    #[serde(rename = "download:complete")]
    Complete(DownloadRecord),
}

impl DownloadEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DownloadEvent::Update(_) => "download:update",
            DownloadEvent::Complete(_) => "download:complete",
        }
    }

    pub fn record(&self) -> &DownloadRecord {
        match self {
            DownloadEvent::Update(r) | DownloadEvent::Complete(r) => r,
        }
    }
}

use std::fmt;

// === DownloadError ===

/// Errors returned by download management operations.
///
/// Transfer failures (network, HTTP status, disk) are not reported here;
/// they are recorded on the download record itself.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadError {
    /// Download with the given ID was not found.
    NotFound(u64),
    /// The download is not currently transferring.
    NotActive(u64),
    /// The download is not paused.
    NotPaused(u64),
    /// The download has already completed.
    AlreadyCompleted(u64),
    /// No async runtime was available to drive transfers.
    RuntimeUnavailable(String),
    /// The HTTP client could not be built.
    ClientInit(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::NotFound(id) => write!(f, "Download not found: {}", id),
            DownloadError::NotActive(id) => write!(f, "Download is not active: {}", id),
            DownloadError::NotPaused(id) => write!(f, "Download is not paused: {}", id),
            DownloadError::AlreadyCompleted(id) => {
                write!(f, "Download already completed: {}", id)
            }
            DownloadError::RuntimeUnavailable(msg) => {
                write!(f, "Download runtime unavailable: {}", msg)
            }
            DownloadError::ClientInit(msg) => {
                write!(f, "Download client initialization failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for DownloadError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

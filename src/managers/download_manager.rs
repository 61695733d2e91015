//! Download Manager for the browser shell.
//!
//! Drives HTTP(S) transfers with pause/resume/cancel support. Resume issues a
//! `Range: bytes=<offset>-` request and appends to the partial file; cancel
//! deletes it. Records live in a [`DownloadRegistry`] and every change is
//! pushed to a [`DownloadEventSink`].
//!
//! Each attempt runs as its own tokio task and owns a `CancellationToken`
//! held in the manager's transfer map. All record mutations happen with the
//! registry locked, and a task re-checks its token under that lock before
//! touching the record, so pause and cancel win against in-flight chunks.
//!
//! An attempt also holds the download's writer lock for as long as it may
//! touch the destination file. A resumed attempt takes that lock before it
//! reads its start offset, so a chunk the previous attempt was still writing
//! is counted before the new ranged request goes out. File I/O never runs
//! with the registry locked.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode, Url};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::managers::download_registry::DownloadRegistry;
use crate::platform;
use crate::services::notification_sink::DownloadEventSink;
use crate::types::download::{
    DownloadRecord, DownloadRequest, DownloadStatus, DEFAULT_FILENAME,
};
use crate::types::errors::DownloadError;

/// Trait defining download management operations.
pub trait DownloadManagerTrait {
    fn start_download(&self, request: DownloadRequest) -> u64;
    fn pause_download(&self, id: u64) -> Result<(), DownloadError>;
    fn resume_download(&self, id: u64) -> Result<(), DownloadError>;
    fn cancel_download(&self, id: u64) -> Result<(), DownloadError>;
    fn list_downloads(&self) -> Vec<DownloadRecord>;
    fn get_download(&self, id: u64) -> Option<DownloadRecord>;
    fn cleanup(&self);
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory for downloads without an explicit filepath.
    pub download_dir: PathBuf,
    pub user_agent: String,
    /// Minimum spacing of progress notifications; zero reports every chunk.
    pub progress_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: platform::get_downloads_dir(),
            user_agent: format!("BrowserShell/{}", env!("CARGO_PKG_VERSION")),
            progress_interval: Duration::ZERO,
        }
    }
}

/// Derives a filename from the last non-empty path segment of `url`.
///
/// Falls back to `"download"` when the URL can't be parsed or has no path.
pub fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// State shared between the manager and its transfer tasks.
struct Shared {
    registry: Arc<DownloadRegistry>,
    sink: Arc<dyn DownloadEventSink>,
    client: Client,
    transfers: Mutex<HashMap<u64, CancellationToken>>,
    writers: Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>,
    progress_interval: Duration,
}

impl Shared {
    fn transfers(&self) -> MutexGuard<'_, HashMap<u64, CancellationToken>> {
        self.transfers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn writers(&self) -> MutexGuard<'_, HashMap<u64, Arc<AsyncMutex<()>>>> {
        self.writers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock serializing every writer of one download's destination file.
    fn writer(&self, id: u64) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.writers().entry(id).or_default())
    }

    fn register(&self, id: u64, token: CancellationToken) {
        if let Some(stale) = self.transfers().insert(id, token) {
            stale.cancel();
        }
    }

    fn abort(&self, id: u64) {
        if let Some(token) = self.transfers().remove(&id) {
            token.cancel();
        }
    }

    /// Marks the record failed. Registry must be locked by the caller.
    fn fail_locked(&self, record: &mut DownloadRecord, message: String) {
        warn!("Download {} failed: {}", record.id, message);
        record.fail(message);
        self.transfers().remove(&record.id);
        self.sink.on_update(record);
    }

    fn fail(&self, id: u64, token: &CancellationToken, message: String) {
        self.registry.with_record(id, |record| {
            if !token.is_cancelled() {
                self.fail_locked(record, message);
            }
        });
    }

    /// Byte offset the attempt resumes from.
    ///
    /// Called with the writer lock held, so every byte already on disk is
    /// counted. A download whose bytes all landed before a pause completes
    /// here without another request.
    fn begin(&self, id: u64, token: &CancellationToken) -> Option<u64> {
        self.registry
            .with_record(id, |record| {
                if token.is_cancelled() {
                    return None;
                }
                if record.size > 0 && record.downloaded >= record.size {
                    self.complete_locked(record);
                    return None;
                }
                Some(record.downloaded)
            })
            .flatten()
    }

    /// Records the size reported by a 2xx response.
    ///
    /// Returns `false` if the attempt was aborted in the meantime.
    fn accept_response(&self, id: u64, token: &CancellationToken, size: u64, restart: bool) -> bool {
        self.registry
            .with_record(id, |record| {
                if token.is_cancelled() {
                    return false;
                }
                if restart {
                    debug!("Download {}: server ignored range, restarting from 0", id);
                    record.downloaded = 0;
                }
                record.size = size;
                true
            })
            .unwrap_or(false)
    }

    /// Accounts for a chunk that is already on disk.
    ///
    /// Returns `false` once the attempt has been aborted or the record is gone.
    fn record_chunk(&self, id: u64, token: &CancellationToken, len: u64, emit: bool) -> bool {
        self.registry
            .with_record(id, |record| {
                if token.is_cancelled() {
                    // The bytes landed before the pause did; resume must start after them.
                    if record.status != DownloadStatus::Cancelled {
                        record.downloaded += len;
                    }
                    return false;
                }
                record.downloaded += len;
                record.refresh_rates(now_ms());
                if emit {
                    self.sink.on_update(record);
                }
                true
            })
            .unwrap_or(false)
    }

    /// Registry must be locked by the caller.
    fn complete_locked(&self, record: &mut DownloadRecord) {
        record.refresh_rates(now_ms());
        record.status = DownloadStatus::Completed;
        record.progress = 100.0;
        self.transfers().remove(&record.id);
        info!(
            "Download {} completed: {} ({} bytes)",
            record.id, record.filename, record.downloaded
        );
        self.sink.on_complete(record);
    }

    fn complete(&self, id: u64, token: &CancellationToken) {
        self.registry.with_record(id, |record| {
            if !token.is_cancelled() {
                self.complete_locked(record);
            }
        });
    }
}

/// One request/response cycle for a download.
struct Attempt {
    id: u64,
    url: String,
    filepath: PathBuf,
    writer: Arc<AsyncMutex<()>>,
    token: CancellationToken,
}

/// Download manager: allocates records in the registry and runs transfers.
pub struct DownloadManager {
    shared: Arc<Shared>,
    download_dir: PathBuf,
    runtime: Handle,
}

impl DownloadManager {
    /// Creates a manager bound to the current tokio runtime.
    pub fn new(
        registry: Arc<DownloadRegistry>,
        sink: Arc<dyn DownloadEventSink>,
        config: DownloadConfig,
    ) -> Result<Self, DownloadError> {
        let runtime =
            Handle::try_current().map_err(|e| DownloadError::RuntimeUnavailable(e.to_string()))?;
        Self::with_runtime(registry, sink, config, runtime)
    }

    /// Creates a manager that spawns transfers onto `runtime`.
    pub fn with_runtime(
        registry: Arc<DownloadRegistry>,
        sink: Arc<dyn DownloadEventSink>,
        config: DownloadConfig,
        runtime: Handle,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DownloadError::ClientInit(e.to_string()))?;

        Ok(Self {
            shared: Arc::new(Shared {
                registry,
                sink,
                client,
                transfers: Mutex::new(HashMap::new()),
                writers: Mutex::new(HashMap::new()),
                progress_interval: config.progress_interval,
            }),
            download_dir: config.download_dir,
            runtime,
        })
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Changes the directory used by later downloads without an explicit filepath.
    pub fn set_download_dir(&mut self, dir: PathBuf) {
        self.download_dir = dir;
    }

    /// Whether an abortable transfer is currently held for `id`.
    pub fn has_live_transfer(&self, id: u64) -> bool {
        self.shared.transfers().contains_key(&id)
    }

    /// Number of transfers currently in flight.
    pub fn active_transfers(&self) -> usize {
        self.shared.transfers().len()
    }

    /// Switches the record to `downloading` and spawns the attempt.
    ///
    /// Must be called from inside a registry closure.
    fn launch(&self, record: &mut DownloadRecord) {
        let token = CancellationToken::new();
        record.status = DownloadStatus::Downloading;
        record.error = None;
        self.shared.register(record.id, token.clone());
        self.shared.sink.on_update(record);

        let attempt = Attempt {
            id: record.id,
            url: record.url.clone(),
            filepath: PathBuf::from(&record.filepath),
            writer: self.shared.writer(record.id),
            token,
        };
        self.runtime.spawn(run_attempt(Arc::clone(&self.shared), attempt));
    }
}

impl DownloadManagerTrait for DownloadManager {
    fn start_download(&self, request: DownloadRequest) -> u64 {
        let id = self.shared.registry.allocate();

        let filename = request
            .filename
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| filename_from_url(&request.url));
        let filepath = request
            .filepath
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| self.download_dir.join(&filename).to_string_lossy().into_owned());

        info!("Starting download: {} (ID: {})", request.url, id);
        self.shared
            .registry
            .insert(DownloadRecord::new(id, &request.url, filename, filepath, now_ms()));
        self.shared.registry.with_record(id, |record| self.launch(record));
        id
    }

    fn pause_download(&self, id: u64) -> Result<(), DownloadError> {
        self.shared
            .registry
            .with_record(id, |record| {
                if record.status != DownloadStatus::Downloading {
                    return Err(DownloadError::NotActive(id));
                }
                record.status = DownloadStatus::Paused;
                record.pause_time = now_ms();
                self.shared.abort(id);
                info!("Download {} paused at {} bytes", id, record.downloaded);
                self.shared.sink.on_update(record);
                Ok(())
            })
            .ok_or(DownloadError::NotFound(id))?
    }

    fn resume_download(&self, id: u64) -> Result<(), DownloadError> {
        self.shared
            .registry
            .with_record(id, |record| {
                if record.status != DownloadStatus::Paused {
                    return Err(DownloadError::NotPaused(id));
                }
                record.total_pause_time += (now_ms() - record.pause_time).max(0);
                record.pause_time = 0;
                info!("Resuming download {} (paused at byte {})", id, record.downloaded);
                self.launch(record);
                Ok(())
            })
            .ok_or(DownloadError::NotFound(id))?
    }

    fn cancel_download(&self, id: u64) -> Result<(), DownloadError> {
        let partial = self
            .shared
            .registry
            .with_record(id, |record| match record.status {
                DownloadStatus::Completed => Err(DownloadError::AlreadyCompleted(id)),
                status if status.is_final() => Ok(None),
                _ => {
                    record.status = DownloadStatus::Cancelled;
                    self.shared.abort(id);
                    info!("Download {} cancelled", id);
                    self.shared.sink.on_update(record);
                    Ok(Some(PathBuf::from(&record.filepath)))
                }
            })
            .ok_or(DownloadError::NotFound(id))??;

        if let Some(path) = partial {
            self.runtime.spawn(remove_partial_file(self.shared.writer(id), path));
        }
        Ok(())
    }

    fn list_downloads(&self) -> Vec<DownloadRecord> {
        self.shared.registry.list()
    }

    fn get_download(&self, id: u64) -> Option<DownloadRecord> {
        self.shared.registry.get(id)
    }

    /// Aborts every live transfer and clears the registry. Partial files stay on disk.
    fn cleanup(&self) {
        let mut aborted = 0usize;
        self.shared.registry.cleanup(|record| {
            self.shared.abort(record.id);
            aborted += 1;
        });
        for (_, token) in self.shared.transfers().drain() {
            token.cancel();
        }
        self.shared.writers().clear();
        info!("Download manager cleaned up ({} transfers aborted)", aborted);
    }
}

async fn run_attempt(shared: Arc<Shared>, attempt: Attempt) {
    let Attempt {
        id,
        url,
        filepath,
        writer,
        token,
    } = attempt;

    // Held until this attempt stops writing; the previous attempt may still be mid-chunk.
    let _writer = tokio::select! {
        _ = token.cancelled() => return,
        guard = writer.lock_owned() => guard,
    };
    let start_byte = match shared.begin(id, &token) {
        Some(offset) => offset,
        None => return,
    };

    let mut request = shared.client.get(url.as_str());
    if start_byte > 0 {
        request = request.header(RANGE, format!("bytes={}-", start_byte));
    }

    let response = tokio::select! {
        _ = token.cancelled() => return,
        result = request.send() => result,
    };
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            shared.fail(id, &token, e.to_string());
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        shared.fail(id, &token, format!("HTTP {}", status.as_u16()));
        return;
    }

    let restart = start_byte > 0 && status != StatusCode::PARTIAL_CONTENT;
    let size = expected_size(status, response.headers(), start_byte);
    if !shared.accept_response(id, &token, size, restart) {
        return;
    }
    let mut file = match open_destination(&filepath, restart).await {
        Ok(file) => file,
        Err(e) => {
            let message = format!("Failed to open {}: {}", filepath.display(), e);
            shared.fail(id, &token, message);
            return;
        }
    };

    let mut stream = response.bytes_stream();
    let mut last_emit: Option<Instant> = None;
    loop {
        let next = tokio::select! {
            _ = token.cancelled() => return,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                // Flush per chunk so `downloaded` never runs ahead of the file.
                let written = match file.write_all(&chunk).await {
                    Ok(()) => file.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    shared.fail(id, &token, e.to_string());
                    return;
                }

                let emit = last_emit.map_or(true, |at| at.elapsed() >= shared.progress_interval);
                if !shared.record_chunk(id, &token, chunk.len() as u64, emit) {
                    return;
                }
                if emit {
                    last_emit = Some(Instant::now());
                }
            }
            Some(Err(e)) => {
                shared.fail(id, &token, e.to_string());
                return;
            }
            None => {
                if let Err(e) = file.sync_all().await {
                    shared.fail(id, &token, e.to_string());
                    return;
                }
                shared.complete(id, &token);
                return;
            }
        }
    }
}

/// Total size the file will have once this response is fully written.
fn expected_size(status: StatusCode, headers: &HeaderMap, start_byte: u64) -> u64 {
    let content_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    if status == StatusCode::PARTIAL_CONTENT {
        let total = headers
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total);
        if let Some(total) = total {
            return total;
        }
        return content_length.map_or(0, |len| start_byte + len);
    }

    content_length.unwrap_or(0)
}

/// Parses the complete length out of `bytes <first>-<last>/<total>`.
fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

async fn open_destination(path: &Path, truncate: bool) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path).await
}

/// Deletes a cancelled download's file once no attempt is writing to it.
async fn remove_partial_file(writer: Arc<AsyncMutex<()>>, path: PathBuf) {
    let _writer = writer.lock_owned().await;
    match fs::remove_file(&path).await {
        Ok(()) => debug!("Deleted partial file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to delete partial file {}: {}", path.display(), e),
    }
}

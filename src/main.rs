//! Browser shell: command-line front end for the download manager.
//!
//! Usage: `browser-shell <url> [filepath]`
//!
//! Downloads one file and prints progress until it completes or fails.

use std::sync::Arc;

use browser_shell::app::App;
use browser_shell::managers::download_manager::DownloadManagerTrait;
use browser_shell::services::notification_sink::ChannelSink;
use browser_shell::types::download::{DownloadEvent, DownloadRequest, DownloadStatus};
use tracing_subscriber::EnvFilter;

fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let url = match args.next() {
        Some(url) => url,
        None => {
            eprintln!("usage: browser-shell <url> [filepath]");
            std::process::exit(2);
        }
    };
    let mut request = DownloadRequest::new(url);
    if let Some(path) = args.next() {
        request = request.with_filepath(path);
    }

    let (sink, mut events) = ChannelSink::new();
    let mut app = match App::new(std::env::var("BROWSER_SHELL_CONFIG").ok(), Arc::new(sink)) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    let id = app.download_manager.start_download(request);
    let mut exit_code = 1;
    while let Some(event) = events.recv().await {
        let record = event.record();
        if record.id != id {
            continue;
        }
        match (&event, record.status) {
            (DownloadEvent::Complete(_), _) => {
                println!(
                    "\nsaved {} ({})",
                    record.filepath,
                    format_bytes(record.downloaded as f64)
                );
                exit_code = 0;
                break;
            }
            (_, DownloadStatus::Error) => {
                eprintln!("\ndownload failed: {}", record.error.as_deref().unwrap_or("unknown error"));
                break;
            }
            (_, DownloadStatus::Downloading) => {
                print!(
                    "\r{:>6.1}%  {}  {}/s   ",
                    record.progress,
                    format_bytes(record.downloaded as f64),
                    format_bytes(record.speed)
                );
                use std::io::Write;
                let _ = std::io::stdout().flush();
            }
            _ => {}
        }
    }

    app.shutdown();
    std::process::exit(exit_code);
}

//! Browser shell RPC Server: JSON-RPC over stdin/stdout for Electron integration.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"downloads.start", "params":{"url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Event:    {"event":"download:update", "payload":{...}}
//!
//! Logs go to stderr; stdout carries only protocol lines.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use browser_shell::app::App;
use browser_shell::rpc_handler::handle_method;
use browser_shell::services::notification_sink::ChannelSink;
use browser_shell::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn init_logging(settings_path: Option<String>) {
    let mut settings = SettingsEngine::new(settings_path);
    let level = settings
        .load()
        .map(|s| s.logging.level)
        .unwrap_or_else(|_| "info".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let settings_path = std::env::var("BROWSER_SHELL_CONFIG").ok();
    init_logging(settings_path.clone());

    let (sink, mut events) = ChannelSink::new();
    let app = match App::new(settings_path, Arc::new(sink)) {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            error!("Failed to initialize browser shell: {}", e);
            std::process::exit(1);
        }
    };
    if let Ok(mut a) = app.lock() {
        a.startup();
    }

    // Single writer so responses and pushed events never interleave mid-line.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = out_rx.recv().await {
            let line = format!("{}\n", message);
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let event_tx = out_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_value(&event) {
                Ok(message) => {
                    if event_tx.send(message).is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize {} event: {}", event.name(), e),
            }
        }
    });

    let _ = out_tx.send(json!({"event":"ready","version":env!("CARGO_PKG_VERSION")}));

    let mut rate_limiter = RateLimiter::new(200);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out_tx.send(json!({"id":null,"error":format!("parse error: {}",e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let _ = out_tx.send(json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params) {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        let _ = out_tx.send(response);
    }

    info!("stdin closed, shutting down");
    if let Ok(mut a) = app.lock() {
        a.shutdown();
    }
    drop(app);
    drop(out_tx);
    let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;
}

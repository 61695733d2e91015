//! RPC method handler for the browser shell JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! download manager and settings engine via the `App` struct.
//!
//! Download operations answer `{"success": true, ...}` when the request was
//! accepted and `{"success": false, "error": "..."}` when a precondition
//! failed. Malformed parameters are returned as `Err`.

use std::sync::Mutex;

use serde_json::{json, Value};

use crate::app::App;
use crate::managers::download_manager::DownloadManagerTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::download::DownloadRequest;
use crate::types::errors::DownloadError;

fn download_id(params: &Value) -> Result<u64, String> {
    params
        .get("id")
        .or_else(|| params.get("downloadId"))
        .and_then(|v| v.as_u64())
        .ok_or_else(|| "missing id".to_string())
}

fn optional_str(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn outcome(result: Result<(), DownloadError>) -> Value {
    match result {
        Ok(()) => json!({"success": true}),
        Err(e) => json!({"success": false, "error": e.to_string()}),
    }
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        // ─── Downloads ───
        "downloads.start" => {
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Ok(json!({
                    "success": false,
                    "error": "invalid url: must start with http:// or https://"
                }));
            }
            let request = DownloadRequest {
                url: url.to_string(),
                filename: optional_str(params, "filename"),
                filepath: optional_str(params, "filepath"),
            };
            let a = app.lock().map_err(|e| e.to_string())?;
            let id = a.download_manager.start_download(request);
            Ok(json!({"success": true, "downloadId": id}))
        }
        "downloads.pause" => {
            let id = download_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(outcome(a.download_manager.pause_download(id)))
        }
        "downloads.resume" => {
            let id = download_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(outcome(a.download_manager.resume_download(id)))
        }
        "downloads.cancel" => {
            let id = download_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(outcome(a.download_manager.cancel_download(id)))
        }
        "downloads.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(a.download_manager.list_downloads()).map_err(|e| e.to_string())
        }
        "downloads.get" => {
            let id = download_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            match a.download_manager.get_download(id) {
                Some(record) => serde_json::to_value(record).map_err(|e| e.to_string()),
                None => Ok(json!({
                    "success": false,
                    "error": DownloadError::NotFound(id).to_string()
                })),
            }
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(a.settings_engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            a.apply_settings();
            Ok(json!({"ok": true}))
        }

        "ping" => Ok(json!({"pong": true})),

        _ => Err(format!("unknown method: {}", method)),
    }
}

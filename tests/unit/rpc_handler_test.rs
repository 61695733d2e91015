//! Unit tests for the RPC handler, driving `handle_method` the same way the
//! `browser-shell-rpc` binary does, with settings stored in a temp directory.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use browser_shell::app::App;
use browser_shell::rpc_handler::handle_method;
use browser_shell::services::notification_sink::NullSink;

/// Create a fresh App whose settings live in a temp directory.
fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let settings_path = tmp.path().join("settings.json");
    let app = App::new(
        Some(settings_path.to_string_lossy().to_string()),
        Arc::new(NullSink),
    )
    .expect("Failed to init App");
    (Mutex::new(app), tmp)
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "ping", &json!({})).unwrap();
    assert_eq!(res, json!({"pong": true}));
}

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({}));
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Downloads ───

#[tokio::test]
async fn test_start_requires_url() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "downloads.start", &json!({}));
    assert_eq!(res.unwrap_err(), "missing url");
}

#[tokio::test]
async fn test_start_rejects_non_http_scheme() {
    let (app, _tmp) = setup();
    for url in ["ftp://example.com/a.bin", "file:///etc/passwd", "javascript:alert(1)"] {
        let res = handle_method(&app, "downloads.start", &json!({"url": url})).unwrap();
        assert_eq!(res["success"], false, "{} must be rejected", url);
        assert!(res["error"].as_str().unwrap().contains("invalid url"));
        assert!(res.get("downloadId").is_none());
    }
    let list = handle_method(&app, "downloads.list", &json!({})).unwrap();
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_start_returns_id_and_registers_record() {
    let (app, tmp) = setup();
    let dest = tmp.path().join("out.bin");
    // Nothing listens on port 9, so the transfer fails quickly.
    let res = handle_method(
        &app,
        "downloads.start",
        &json!({"url": "http://127.0.0.1:9/out.bin", "filepath": dest.to_string_lossy()}),
    )
    .unwrap();
    assert_eq!(res["success"], true);
    let id = res["downloadId"].as_u64().unwrap();
    assert_eq!(id, 1);

    let record = handle_method(&app, "downloads.get", &json!({"id": id})).unwrap();
    assert_eq!(record["id"], id);
    assert_eq!(record["filename"], "out.bin");
    assert_eq!(record["filepath"], dest.to_string_lossy().to_string());

    let list = handle_method(&app, "downloads.list", &json!({})).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Wait for the refused connection to surface as an error record.
    let mut status = record["status"].clone();
    for _ in 0..100 {
        let current = handle_method(&app, "downloads.get", &json!({"downloadId": id})).unwrap();
        status = current["status"].clone();
        if status == "error" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status, "error");

    let res = handle_method(&app, "downloads.cancel", &json!({"id": id})).unwrap();
    assert_eq!(res, json!({"success": true}));
}

#[tokio::test]
async fn test_operations_on_unknown_id_report_failure() {
    let (app, _tmp) = setup();
    for method in ["downloads.pause", "downloads.resume", "downloads.cancel", "downloads.get"] {
        let res = handle_method(&app, method, &json!({"id": 42})).unwrap();
        assert_eq!(res["success"], false, "{} must fail", method);
        assert_eq!(res["error"], "Download not found: 42");
    }
}

#[tokio::test]
async fn test_operations_require_id() {
    let (app, _tmp) = setup();
    for method in ["downloads.pause", "downloads.resume", "downloads.cancel", "downloads.get"] {
        let res = handle_method(&app, method, &json!({"id": "one"}));
        assert_eq!(res.unwrap_err(), "missing id");
    }
}

// ─── Settings ───

#[tokio::test]
async fn test_settings_get_returns_defaults() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "settings.get", &json!({})).unwrap();
    assert_eq!(res["downloads"]["progress_interval_ms"], 0);
    assert_eq!(res["logging"]["level"], "info");
}

#[tokio::test]
async fn test_settings_set_applies_download_directory() {
    let (app, tmp) = setup();
    let target = tmp.path().join("incoming");
    let res = handle_method(
        &app,
        "settings.set",
        &json!({"key": "downloads.directory", "value": target.to_string_lossy()}),
    )
    .unwrap();
    assert_eq!(res, json!({"ok": true}));

    let a = app.lock().unwrap();
    assert_eq!(a.download_manager.download_dir(), target.as_path());
    assert!(tmp.path().join("settings.json").exists());
}

#[tokio::test]
async fn test_settings_set_rejects_bad_input() {
    let (app, _tmp) = setup();
    assert_eq!(
        handle_method(&app, "settings.set", &json!({"value": 1})).unwrap_err(),
        "missing key"
    );
    assert_eq!(
        handle_method(&app, "settings.set", &json!({"key": "logging.level"})).unwrap_err(),
        "missing value"
    );
    let err = handle_method(
        &app,
        "settings.set",
        &json!({"key": "downloads.unknown", "value": 1}),
    )
    .unwrap_err();
    assert!(err.contains("Invalid settings key"));
}

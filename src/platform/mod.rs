// Browser shell platform abstraction
// Provides platform-specific paths for Windows, macOS, and Linux.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory for the browser shell.
///
/// - **Linux**: `~/.config/browser-shell` (or `$XDG_CONFIG_HOME/browser-shell`)
/// - **macOS**: `~/Library/Application Support/BrowserShell`
/// - **Windows**: `%APPDATA%/BrowserShell`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the per-user downloads directory.
///
/// - **Linux**: `$XDG_DOWNLOAD_DIR`, otherwise `~/Downloads`
/// - **macOS**: `~/Downloads`
/// - **Windows**: `%USERPROFILE%/Downloads`
pub fn get_downloads_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_downloads_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_downloads_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_downloads_dir()
    }
}

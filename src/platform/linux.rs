// Browser shell platform paths for Linux
// Config:    ~/.config/browser-shell
// Downloads: $XDG_DOWNLOAD_DIR or ~/Downloads

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the configuration directory on Linux.
/// Uses `$XDG_CONFIG_HOME/browser-shell` if set, otherwise `~/.config/browser-shell`.
pub fn get_config_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("browser-shell")
    } else {
        home_dir().join(".config").join("browser-shell")
    }
}

/// Returns the downloads directory on Linux.
pub fn get_downloads_dir() -> PathBuf {
    match env::var("XDG_DOWNLOAD_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir().join("Downloads"),
    }
}

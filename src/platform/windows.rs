// Browser shell platform paths for Windows
// Config:    %APPDATA%/BrowserShell
// Downloads: %USERPROFILE%/Downloads

use std::env;
use std::path::PathBuf;

/// `%APPDATA%/BrowserShell`
pub fn get_config_dir() -> PathBuf {
    let appdata =
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("BrowserShell")
}

/// `%USERPROFILE%/Downloads`
pub fn get_downloads_dir() -> PathBuf {
    let profile =
        env::var("USERPROFILE").unwrap_or_else(|_| String::from("C:\\Users\\Default"));
    PathBuf::from(profile).join("Downloads")
}

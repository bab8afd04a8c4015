//! Platform configuration and log paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/mcp-harness/`
//! - macOS: `~/Library/Application Support/mcp-harness/`
//! - Windows: `%APPDATA%\mcp-harness\`

use std::path::PathBuf;

/// Application name used for config and data directories
const APP_NAME: &str = "mcp-harness";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

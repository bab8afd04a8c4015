//! Logging and tracing configuration
//!
//! Console logs go to stderr so that stdout stays free for reports.
//! A log file can be added for long runs against a real server.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
/// Returns the path of the log file when file logging could be enabled.
pub fn init(log_file: Option<&Path>) -> Option<PathBuf> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("harness=info,warn"));

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: Could not open log file: {}", e);
                None
            }
        }
    });
    let opened = file.is_some();

    // File logging with full details
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .compact(),
        )
        .init();

    if opened {
        log_file.map(Path::to_path_buf)
    } else {
        None
    }
}

/// Default location for the run log
pub fn default_log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join("harness.log"))
}

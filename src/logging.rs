//! Logger initialisation
//!
//! Events go to stderr (stdout stays free for command output) and, when a
//! log file is configured, are appended to that file without colours.

use crate::error::{SheetsmithError, SheetsmithResult};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the configured level / filter
pub const LOG_ENV: &str = "SHEETSMITH_LOG";

/// Install the global subscriber
///
/// `level` is used when `SHEETSMITH_LOG` is unset or invalid. Calling this
/// more than once is harmless; later calls leave the first subscriber in place.
pub fn init(level: &str, log_file: Option<&Path>) -> SheetsmithResult<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SheetsmithError::PathUnwritable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // Already initialised (tests, repeated CLI setup): keep the first one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}

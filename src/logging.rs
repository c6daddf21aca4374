//! Logging configuration for sqlrun.
//!
//! Diagnostics go to stderr by default so they never interleave with the
//! stdout report, or to a log file when `--log-file` is given.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, SqlRunError};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to a file, truncated on each run.
pub fn init_file_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SqlRunError::io(parent, e))?;
    }

    let log_file = File::create(log_path).map_err(|e| SqlRunError::io(log_path, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(log_file))
        .with_ansi(false) // No ANSI colors in file output
        .init();

    Ok(())
}

//! Logging infrastructure for datajanitor
//!
//! Logs are written to the console and to a daily rotating file in the
//! application data directory (or the directory set in the config file).
//!
//! ## Usage
//!
//! ```no_run
//! use datajanitor::{config, logging};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = config::load_app_config(None);
//! // Keep the guard alive until exit so buffered lines reach the file
//! let _guard = logging::init(&config)?;
//!
//! tracing::info!("App started");
//! # Ok(())
//! # }
//! ```
//!
//! Dataset-level events (shapes, null counts, before/after of each
//! operation) go through a [`FrameLogger`] owned by the session.

use crate::config::AppConfig;
use anyhow::{Context as _, Result};
use polars::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

const LOG_PREFIX: &str = "datajanitor";

/// Keeps the non-blocking file writer alive; dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    log_dir: PathBuf,
    _worker: WorkerGuard,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Gets the log directory path, creating it if needed
///
/// Without an override this is the platform data directory:
/// - Windows: `%APPDATA%/datajanitor/logs`
/// - macOS: `~/Library/Application Support/datajanitor/logs`
/// - Linux: `~/.local/share/datajanitor/logs`
pub fn get_log_dir(custom: Option<&Path>) -> Result<PathBuf> {
    let log_dir = match custom {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()
            .context("Failed to determine data directory")?
            .join(LOG_PREFIX)
            .join("logs"),
    };

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

/// Initializes console and file logging
///
/// The level defaults to INFO and can be overridden with `RUST_LOG`.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the file appender fails
pub fn init(config: &AppConfig) -> Result<LoggingGuard> {
    let log_dir = get_log_dir(config.log_dir.as_deref())?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create log file appender")?;
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Logging already initialized")?;

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());

    Ok(LoggingGuard {
        log_dir,
        _worker: worker,
    })
}

/// Gets the path to today's log file
pub fn current_log_path(log_dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    log_dir.join(format!("{LOG_PREFIX}.{today}.log"))
}

/// Read a log file in full
pub fn read_log_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file: {}", path.display()))
}

/// Dataset-aware logging for one session.
#[derive(Debug, Default)]
pub struct FrameLogger {
    last_log_id: Option<String>,
}

impl FrameLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log shape, columns and null counts of `df`.
    ///
    /// A repeat of the same operation on a frame of the same shape is skipped.
    /// Returns whether anything was logged.
    pub fn log_data_info(&mut self, df: &DataFrame, operation: &str) -> bool {
        let (rows, columns) = df.shape();
        let log_id = format!("{operation}_{rows}x{columns}");
        if self.last_log_id.as_deref() == Some(log_id.as_str()) {
            return false;
        }

        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        let nulls: Vec<String> = df
            .get_columns()
            .iter()
            .map(|c| format!("{}={}", c.name(), c.null_count()))
            .collect();

        tracing::info!(operation, rows, columns, "Data info");
        tracing::info!("  columns: {}", names.join(", "));
        tracing::info!("  na_counts: {}", nulls.join(", "));
        tracing::debug!("  estimated_size: {:.2} MB", df.estimated_size() as f64 / 1024.0 / 1024.0);

        self.last_log_id = Some(log_id);
        true
    }

    pub fn log_operation_result(
        &self,
        operation: &str,
        before: (usize, usize),
        after: (usize, usize),
        details: Option<&Value>,
    ) {
        tracing::info!("{operation} changed shape from {before:?} to {after:?}");
        match details {
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    tracing::info!("  {key}: {value}");
                }
            }
            Some(other) => tracing::info!("  {other}"),
            None => {}
        }
    }

    pub fn log_error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_dir_with_override() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let custom = dir.path().join("nested").join("logs");
        let log_dir = get_log_dir(Some(&custom))?;
        assert_eq!(log_dir, custom);
        assert!(log_dir.is_dir());
        Ok(())
    }

    #[test]
    fn test_repeated_data_info_is_skipped() -> Result<()> {
        let df = df!("a" => [1i64, 2], "b" => [Some("x"), None])?;
        let mut logger = FrameLogger::new();
        assert!(logger.log_data_info(&df, "Initial Load"));
        assert!(!logger.log_data_info(&df, "Initial Load"));
        assert!(logger.log_data_info(&df, "Before Scruff"));
        Ok(())
    }

    #[test]
    fn test_read_log_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = current_log_path(dir.path());
        std::fs::write(&path, "INFO started\n")?;
        assert_eq!(read_log_file(&path)?, "INFO started\n");
        assert!(read_log_file(&dir.path().join("missing.log")).is_err());
        Ok(())
    }
}

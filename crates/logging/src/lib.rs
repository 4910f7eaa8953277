//! Logging initialisation for the incremental analysis front ends.
//!
//! Two modes are supported:
//! - CLI mode: human readable logs on STDERR, so STDOUT stays free for command output.
//! - File mode: JSON lines in a rolling file under the given directory.
//!
//! File logs are rolled over when they reach 5 MB. Rotated logs are compressed and at
//! most 20 of them are kept.

use anyhow::{Context, Result};
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt};

pub const LOG_FILE_NAME: &str = "incr.log";
const MAX_LOG_FILE_BYTES: usize = 5 * 1024 * 1024;
const MAX_ROTATED_LOGS: usize = 20;

pub enum LogMode {
    Cli,
    File { log_dir: PathBuf },
}

/// Guard that keeps background logging workers alive.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

fn rotating_writer(log_dir: &Path) -> Result<FileRotate<AppendCount>> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    Ok(FileRotate::new(
        log_file_path(log_dir),
        AppendCount::new(MAX_ROTATED_LOGS),
        ContentLimit::Bytes(MAX_LOG_FILE_BYTES),
        Compression::OnRotate(1),
        None,
    ))
}

pub fn init(mode: LogMode, verbose: bool) -> Result<Option<LoggingGuards>> {
    let filter = filter(verbose);

    match mode {
        LogMode::Cli => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;
            Ok(None)
        }
        LogMode::File { log_dir } => {
            let writer = rotating_writer(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(writer);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking.with_max_level(tracing::Level::DEBUG))
                .with_ansi(false)
                .json()
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

            Ok(Some(LoggingGuards {
                _guards: vec![guard],
            }))
        }
    }
}

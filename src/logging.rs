//! Tracing setup for the `sermo-*` binaries.
//!
//! Each binary logs to stdout and to its own per-run file under `<app root>/logs`,
//! named `<binary>_<timestamp>.log`. Only the newest files of that binary are kept.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const FILE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
const LINE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Log file I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file timestamp: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("A global tracing subscriber is already installed: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Per-binary logging knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    /// File name prefix, usually the binary name.
    pub prefix: &'static str,
    /// How many of this binary's log files survive pruning.
    pub keep_files: usize,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl LogOptions {
    pub const fn for_binary(prefix: &'static str) -> Self {
        Self {
            prefix,
            keep_files: 10,
            default_filter: "info",
        }
    }
}

/// Install the global subscriber and return the path of this run's log file.
///
/// A second call returns `SetGlobal`; callers print the error and carry on with whatever
/// subscriber is already active.
pub fn init(options: LogOptions) -> Result<PathBuf, LoggingError> {
    let dir = app_dirs::logs_dir()?;
    let file_name = log_file_name(options.prefix, local_now())?;
    let path = dir.join(&file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::Io {
            path: path.clone(),
            source,
        })?;
    prune_logs(&dir, options.prefix, options.keep_files)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, &file_name));
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = fmt::time::OffsetTime::new(offset, LINE_TIME_FORMAT);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_filter));

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_timer(timer.clone()).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOG_GUARD.set(guard);
    tracing::info!(log_file = %path.display(), "Logging initialized");
    Ok(path)
}

fn log_file_name(prefix: &str, now: OffsetDateTime) -> Result<String, LoggingError> {
    Ok(format!("{prefix}_{}.log", now.format(FILE_TIME_FORMAT)?))
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Delete the oldest `<prefix>_*.log` files in `dir` beyond `keep`.
fn prune_logs(dir: &Path, prefix: &str, keep: usize) -> Result<(), LoggingError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LoggingError::Io { path, source }
    };
    let marker = format!("{prefix}_");
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .map_err(io_err(dir))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
            name.starts_with(&marker) && name.ends_with(".log") && path.is_file()
        })
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    logs.sort();
    let excess = logs.len().saturating_sub(keep);
    for (_, path) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(io_err(&path))?;
    }
    Ok(())
}

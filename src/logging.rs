//! Tracing setup. Without a log directory everything goes to stderr; with
//! one, output goes to rotating files written off-thread and the oldest
//! files are removed at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const FILE_PREFIX: &str = "lifx-dash";
const FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    fn appender_rotation(self) -> Rotation {
        match self {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Log directory; stderr when unset.
    pub dir: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Log files kept on disk, 0 keeps everything.
    pub keep_files: usize,
    /// Filter used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            rotation: LogRotation::Daily,
            keep_files: 7,
            filter: "lifx_dash=info".to_string(),
        }
    }
}

#[must_use = "file logging stops when the guard is dropped"]
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

pub fn init_logging(settings: &LogSettings) -> std::io::Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    let Some(dir) = &settings.dir else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(LogGuard { _guard: None });
    };

    std::fs::create_dir_all(dir)?;
    if settings.keep_files > 0 {
        remove_old_logs(dir, settings.keep_files)?;
    }

    let mut builder = RollingFileAppender::builder()
        .rotation(settings.rotation.appender_rotation())
        .filename_prefix(FILE_PREFIX)
        .filename_suffix(FILE_SUFFIX);
    if settings.keep_files > 0 {
        builder = builder.max_log_files(settings.keep_files);
    }
    let appender = builder.build(dir).map_err(std::io::Error::other)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_line_number(true)
        .init();
    Ok(LogGuard {
        _guard: Some(guard),
    })
}

fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
}

/// Keeps the `keep` most recently modified log files in `dir` and returns
/// how many were removed.
fn remove_old_logs(dir: &Path, keep: usize) -> std::io::Result<usize> {
    let mut logs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !is_log_file(&path) {
            continue;
        }
        let modified = std::fs::metadata(&path)?.modified()?;
        logs.push((modified, path));
    }

    logs.sort_by(|a, b| b.0.cmp(&a.0));
    let stale = logs.split_off(keep.min(logs.len()));
    for (_, path) in &stale {
        std::fs::remove_file(path)?;
    }
    Ok(stale.len())
}

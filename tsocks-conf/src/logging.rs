//! Log output setup

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Numeric log threshold: <0 off, 0 errors, 1 warnings, 2+ debug
pub const DEBUG_LEVEL_ENV: &str = "TSOCKS_DEBUG";

/// Append log output to this file instead of stderr
pub const DEBUG_FILE_ENV: &str = "TSOCKS_DEBUG_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub level: LevelFilter,
    pub file: Option<PathBuf>,
    pub timestamps: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: LevelFilter::ERROR,
            file: None,
            timestamps: false,
        }
    }
}

impl LogOptions {
    /// Read options from `TSOCKS_DEBUG` and `TSOCKS_DEBUG_FILE`
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(level) = std::env::var(DEBUG_LEVEL_ENV)
            .ok()
            .and_then(|value| Self::level_from_debug(&value))
        {
            options.level = level;
        }
        options.file = std::env::var_os(DEBUG_FILE_ENV)
            .filter(|file| !file.is_empty())
            .map(PathBuf::from);
        options
    }

    /// Map a numeric debug threshold to a level filter
    pub fn level_from_debug(value: &str) -> Option<LevelFilter> {
        let level = value.trim().parse::<i32>().ok()?;
        Some(match level {
            i32::MIN..=-1 => LevelFilter::OFF,
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            _ => LevelFilter::DEBUG,
        })
    }
}

/// Wall-clock time plus process id, e.g. `14:02:11(4711)`
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}({})",
            chrono::Local::now().format("%H:%M:%S"),
            std::process::id()
        )
    }
}

/// Pick the log destination: the file in append mode, or stderr if there is
/// no file or it can't be opened. The open failure is handed back so it can
/// be logged once the subscriber is installed.
pub fn log_writer(file: Option<&Path>) -> (BoxMakeWriter, Option<(PathBuf, io::Error)>) {
    let Some(path) = file else {
        return (BoxMakeWriter::new(io::stderr), None);
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), None),
        Err(e) => (BoxMakeWriter::new(io::stderr), Some((path.to_path_buf(), e))),
    }
}

/// Install the global `tracing` subscriber
pub fn init_logging(options: &LogOptions) -> anyhow::Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive(options.level.into());

    let (writer, open_error) = log_writer(options.file.as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(false);
    let installed = if options.timestamps {
        builder.with_timer(ClockTime).try_init()
    } else {
        builder.without_time().try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))?;

    if let Some((path, e)) = open_error {
        tracing::error!("Could not open log file, {}, {}", path.display(), e);
    }

    Ok(())
}

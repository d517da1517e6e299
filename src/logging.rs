use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "taskboard.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    DirectoryError(#[from] std::io::Error),
    #[error("Failed to install log subscriber: {0}")]
    InitError(String),
}

/// Build the filter: `RUST_LOG` wins, otherwise `taskboard=<level>` from the config.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(format!("taskboard={level},warn"))
            .unwrap_or_else(|_| EnvFilter::new("taskboard=info,warn"))
    })
}

/// Route `tracing` output to `<dir>/taskboard.log`. The terminal belongs to the TUI, so
/// nothing is written to stdout or stderr.
///
/// The returned guard flushes the writer on drop; keep it alive until exit.
pub fn init(dir: &Path, level: &str) -> Result<WorkerGuard, LoggingError> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| LoggingError::InitError(e.to_string()))?;

    Ok(guard)
}

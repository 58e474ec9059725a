mod config;
mod error;
mod log;
mod object;

use std::{
    fs::{File, OpenOptions},
    path::Path,
};

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use object::{LoggerFormat, LoggerLevel, LoggerRfc3339};

/// Installs the global tracing subscriber, writing to stderr.
///
/// All `tracing` macros (`info!`, `debug!`, ...) use this configuration once
/// installed. A second call fails with [`LoggerError::AlreadyInitialized`].
///
/// # Examples
/// ```rust
/// use pane_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// init_logger(&config).expect("Failed to initialize logger");
///
/// tracing::info!("Logger initialized successfully");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    log::logger_stderr(cfg)
}

/// Installs the global subscriber writing to the file at `path`.
///
/// An existing file is truncated: the log covers one run. Colors are never
/// used in files, whatever `use_color` says.
pub fn init_file_logger(cfg: &LoggerConfig, path: &Path) -> LoggerResult<()> {
    log::logger_file(cfg, open_log_file(path)?)
}

fn open_log_file(path: &Path) -> LoggerResult<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| LoggerError::OpenFile {
            path: path.to_path_buf(),
            source,
        })
}

use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    object::{LoggerFormat, LoggerRfc3339},
};

/// Install a subscriber writing `cfg`-formatted events to `writer`.
pub(crate) fn install<W>(cfg: &LoggerConfig, writer: W, ansi: bool) -> LoggerResult<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = cfg.level.to_env_filter();
    match cfg.format {
        LoggerFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(cfg.with_targets)
                .with_timer(LoggerRfc3339)
                .with_writer(writer);
            init_subscriber(tracing_subscriber::registry().with(filter).with(layer))
        }
        LoggerFormat::Text => {
            let layer = fmt::layer()
                .with_ansi(ansi)
                .with_target(cfg.with_targets)
                .with_timer(LoggerRfc3339)
                .with_writer(writer);
            init_subscriber(tracing_subscriber::registry().with(filter).with(layer))
        }
    }
}

/// Installs the subscriber as the global default.
fn init_subscriber<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

/// Events go to stderr; stdout stays free for payloads.
pub(crate) fn logger_stderr(cfg: &LoggerConfig) -> LoggerResult<()> {
    install(cfg, std::io::stderr, cfg.should_use_color())
}

pub(crate) fn logger_file(cfg: &LoggerConfig, file: std::fs::File) -> LoggerResult<()> {
    install(cfg, Mutex::new(file), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let open = || std::fs::File::create(dir.path().join("log.txt")).unwrap();
        let cfg = LoggerConfig::default();

        // Another test may have installed one already; either way the last call fails.
        let _ = logger_file(&cfg, open());
        assert!(matches!(
            logger_file(&cfg, open()),
            Err(LoggerError::AlreadyInitialized)
        ));
    }
}

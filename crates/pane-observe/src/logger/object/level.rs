use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

/// Validated `EnvFilter` expression, e.g. `"info"` or `"pane_exec=trace,info"`.
///
/// Kept as the raw string so it serializes the way it was written; the filter
/// itself is built on demand with [`LoggerLevel::to_env_filter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    /// Level used by the runner's `--debug` switch.
    pub fn debug() -> Self {
        Self("debug".to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_env_filter(&self) -> EnvFilter {
        // Validated on construction; the fallback only guards the invariant.
        EnvFilter::try_new(self.as_str()).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match EnvFilter::try_new(&s) {
            Ok(_) => Ok(LoggerLevel(s)),
            Err(e) => Err(LoggerError::InvalidLevel(format!("{s}: {e}"))),
        }
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_levels() {
        for lvl in ["info", "warn", "trace", "pane_exec=trace,pane_core=debug,info"] {
            let parsed = lvl.parse::<LoggerLevel>();
            assert!(parsed.is_ok(), "expected valid level for {lvl}, got {parsed:?}");
        }
    }

    #[test]
    fn rejects_invalid_levels() {
        for lvl in ["pane_exec=verbose", "root=info,sub=xyz"] {
            assert!(LoggerLevel::from_str(lvl).is_err(), "expected error for {lvl}");
        }
    }

    #[test]
    fn serde_keeps_raw_string() {
        let lvl: LoggerLevel = serde_json::from_str(r#""pane_core=debug,info""#).unwrap();
        assert_eq!(lvl.as_str(), "pane_core=debug,info");
        assert_eq!(serde_json::to_string(&lvl).unwrap(), r#""pane_core=debug,info""#);

        assert!(serde_json::from_str::<LoggerLevel>(r#""x=lol""#).is_err());
    }

    #[test]
    fn defaults() {
        assert_eq!(LoggerLevel::default().as_str(), "info");
        assert_eq!(LoggerLevel::debug().as_str(), "debug");
        let _ = LoggerLevel::default().to_env_filter();
    }
}

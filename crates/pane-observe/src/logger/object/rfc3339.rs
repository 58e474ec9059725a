use std::fmt;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

/// RFC3339 UTC timestamps, e.g. `2026-10-19T08:15:02.123456Z`.
#[derive(Debug, Clone, Copy)]
pub struct LoggerRfc3339;

impl LoggerRfc3339 {
    pub(crate) fn now() -> Option<String> {
        OffsetDateTime::now_utc().format(&Rfc3339).ok()
    }
}

impl FormatTime for LoggerRfc3339 {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match Self::now() {
            Some(ts) => write!(w, "{ts} "),
            None => write!(w, "<invalid-time> "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_utc_rfc3339() {
        let ts = LoggerRfc3339::now().unwrap();
        assert!(ts.ends_with('Z'), "{ts}");
        assert!(OffsetDateTime::parse(&ts, &Rfc3339).is_ok());
    }
}

use std::{fmt, str::FromStr};

use crate::error::{ModelError, ModelResult};

/// Format hint attached to a script parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamFormat {
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Time of day with optional UTC offset.
    Time,
    /// RFC 3339 timestamp.
    DateTime,
}

impl FromStr for ParamFormat {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(ParamFormat::Date),
            "time" => Ok(ParamFormat::Time),
            "date-time" | "datetime" => Ok(ParamFormat::DateTime),
            other => Err(ModelError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ParamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamFormat::Date => "date",
            ParamFormat::Time => "time",
            ParamFormat::DateTime => "date-time",
        };
        f.write_str(s)
    }
}

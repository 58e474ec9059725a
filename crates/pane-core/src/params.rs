//! Parameter formatting.
//!
//! Applies the optional `formats` hints of a [`RunnerConfig`] to its params before
//! they are injected into the script. Values stay strings, but in canonical form.
use serde_json::Value;
use time::{
    Date, OffsetDateTime, Time, UtcOffset, format_description::well_known::Rfc3339,
    macros::format_description,
};
use tracing::debug;

use pane_model::{ModelError, ParamFormat, Params, RunnerConfig};

/// Copy of `config.config` with every formatted param normalized.
///
/// Unknown format names and `null` values pass through untouched. A formatted
/// param the caller left out is bound to `null`, so the script still sees it.
pub fn format_params(config: &RunnerConfig) -> Result<Params, ModelError> {
    let mut params = config.config.clone();
    for (name, format) in &config.formats {
        let value = params.entry(name.clone()).or_insert(Value::Null);
        let format = match format.parse::<ParamFormat>() {
            Ok(f) => f,
            Err(e) => {
                debug!(param = %name, "skipping param format: {e}");
                continue;
            }
        };
        if let Some(formatted) = format_value(name, format, value)? {
            *value = Value::String(formatted);
        }
    }
    Ok(params)
}

fn format_value(name: &str, format: ParamFormat, value: &Value) -> Result<Option<String>, ModelError> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.as_str(),
        other => {
            return Err(invalid(name, format!("expected a {format} string, got {other}")));
        }
    };

    let out = match format {
        ParamFormat::Date => format_date(raw),
        ParamFormat::Time => format_time(raw),
        ParamFormat::DateTime => format_date_time(raw),
    };
    out.map(Some).map_err(|reason| invalid(name, reason))
}

fn invalid(param: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidParam {
        param: param.to_string(),
        reason: reason.into(),
    }
}

/// `YYYY-MM-DD`, or the date part of a full timestamp.
fn format_date(raw: &str) -> Result<String, String> {
    let date_fmt = format_description!("[year]-[month]-[day]");
    let date = match Date::parse(raw, date_fmt) {
        Ok(d) => d,
        Err(_) => parse_date_time(raw)?.date(),
    };
    date.format(date_fmt).map_err(|e| e.to_string())
}

/// `HH:MM[:SS[.fff]]` with an optional `Z` or `±HH:MM` suffix.
fn format_time(raw: &str) -> Result<String, String> {
    let (clock, offset) = split_offset(raw);

    let time = Time::parse(
        clock,
        format_description!("[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"),
    )
    .map_err(|e| format!("invalid time {raw:?}: {e}"))?;

    let mut out = if time.nanosecond() == 0 {
        time.format(format_description!("[hour]:[minute]:[second]"))
    } else {
        time.format(format_description!("[hour]:[minute]:[second].[subsecond]"))
    }
    .map_err(|e| e.to_string())?;

    if let Some(offset) = offset {
        let parsed = if offset == "Z" {
            UtcOffset::UTC
        } else {
            UtcOffset::parse(
                offset,
                format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
            )
            .map_err(|e| format!("invalid offset {offset:?}: {e}"))?
        };
        let suffix = parsed
            .format(format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
            .map_err(|e| e.to_string())?;
        out.push_str(&suffix);
    }
    Ok(out)
}

/// RFC 3339, `Z` normalised to `+00:00`.
fn format_date_time(raw: &str) -> Result<String, String> {
    let dt = parse_date_time(raw)?;
    let out = dt.format(&Rfc3339).map_err(|e| e.to_string())?;
    Ok(match out.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => out,
    })
}

fn parse_date_time(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}

fn split_offset(raw: &str) -> (&str, Option<&str>) {
    if let Some(head) = raw.strip_suffix('Z') {
        return (head, Some("Z"));
    }
    match raw.rfind(['+', '-']) {
        Some(idx) => (&raw[..idx], Some(&raw[idx..])),
        None => (raw, None),
    }
}

//! UTC timetag rendering for the `at` query parameter.

use chrono::{DateTime, Utc};

use crate::measurement::VarValue;

use super::BuildError;

const TIMETAG_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render Unix seconds as `YYYY-MM-DDTHH:MM:SSZ` in UTC.
pub fn format_timetag(unix_secs: i64) -> Result<String, BuildError> {
    DateTime::<Utc>::from_timestamp(unix_secs, 0)
        .map(|dt| dt.format(TIMETAG_FORMAT).to_string())
        .ok_or_else(|| BuildError::InvalidTimestamp(unix_secs.to_string()))
}

/// Resolve the `at` variable into the string placed on the wire.
///
/// Text is assumed to be an already formatted timetag and passes through
/// unchanged. Fractional seconds are truncated.
pub(super) fn render_at(value: &VarValue) -> Result<String, BuildError> {
    match value {
        VarValue::Int(secs) => format_timetag(*secs),
        VarValue::Float(secs) if secs.is_finite() => format_timetag(secs.trunc() as i64),
        VarValue::Text(tag) => Ok(tag.clone()),
        VarValue::Float(_) | VarValue::Bool(_) => {
            Err(BuildError::InvalidTimestamp(value.to_string()))
        }
    }
}

//! Timestamp normalization for `captured_at`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{RecordError, RecordResult};

/// Naive layouts tried in order; all are interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%a %b %d, %Y %I:%M%p",
    "%a %b %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M%p",
    "%b %d, %Y %I:%M %p",
];

/// Parse a textual timestamp in any accepted layout.
pub fn parse_timestamp(raw: &str) -> RecordResult<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(RecordError::InvalidTimestamp(raw.to_string()));
    }

    if let Ok(secs) = s.parse::<i64>() {
        return from_epoch(secs);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(RecordError::InvalidTimestamp(raw.to_string()))
}

/// Normalize a JSON timestamp: a string in any accepted layout, or epoch seconds.
pub fn timestamp_from_value(value: &Value) -> RecordResult<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                return from_epoch(secs);
            }
            let secs = n
                .as_f64()
                .ok_or_else(|| RecordError::InvalidTimestamp(n.to_string()))?;
            DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                .ok_or_else(|| RecordError::InvalidTimestamp(n.to_string()))
        }
        other => Err(RecordError::InvalidTimestamp(other.to_string())),
    }
}

fn from_epoch(secs: i64) -> RecordResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| RecordError::InvalidTimestamp(secs.to_string()))
}

//! Instant parsing and formatting.
//!
//! Clients send dates in several shapes: ISO 8601 text (with or without a
//! time or offset), epoch milliseconds, or the `{_seconds, _nanoseconds}`
//! object that Firestore timestamps serialize to. Every date field goes
//! through [`parse_instant`] exactly once, so a malformed value is rejected
//! before it can take part in a comparison.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Error returned when a value cannot be read as a point in time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A date or date-time exactly as the client sent it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawInstant {
    /// Milliseconds since the Unix epoch.
    Millis(i64),

    /// ISO 8601 / RFC 3339 text.
    Text(String),

    /// Firestore's serialized timestamp object.
    Timestamp {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds", default)]
        nanoseconds: u32,
    },
}

impl RawInstant {
    /// True for empty or whitespace-only text, which callers treat as absent.
    pub fn is_blank(&self) -> bool {
        matches!(self, RawInstant::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for RawInstant {
    fn from(s: &str) -> Self {
        RawInstant::Text(s.to_string())
    }
}

/// Naive date-time layouts accepted without an offset. Interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a raw client value into a UTC instant.
///
/// Text without an offset is read as UTC; a bare date is midnight UTC.
///
/// # Examples
///
/// ```
/// use travel_server::domain::{RawInstant, parse_instant};
///
/// let t = parse_instant(&RawInstant::from("2024-08-01T10:00")).unwrap();
/// assert_eq!(t.to_rfc3339(), "2024-08-01T10:00:00+00:00");
///
/// let d = parse_instant(&RawInstant::from("2024-08-01")).unwrap();
/// assert_eq!(d.to_rfc3339(), "2024-08-01T00:00:00+00:00");
///
/// assert!(parse_instant(&RawInstant::from("next tuesday")).is_err());
/// ```
pub fn parse_instant(raw: &RawInstant) -> Result<DateTime<Utc>, TimeError> {
    match raw {
        RawInstant::Millis(ms) => Utc
            .timestamp_millis_opt(*ms)
            .single()
            .ok_or_else(|| TimeError::new("timestamp out of range")),
        RawInstant::Timestamp {
            seconds,
            nanoseconds,
        } => {
            if *nanoseconds >= 1_000_000_000 {
                return Err(TimeError::new("nanoseconds must be below one second"));
            }
            Utc.timestamp_opt(*seconds, *nanoseconds)
                .single()
                .ok_or_else(|| TimeError::new("timestamp out of range"))
        }
        RawInstant::Text(s) => parse_text(s.trim()),
    }
}

fn parse_text(s: &str) -> Result<DateTime<Utc>, TimeError> {
    if s.is_empty() {
        return Err(TimeError::new("empty value"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| TimeError::new("unrecognized date format"))
}

/// Format an instant as a calendar date (`YYYY-MM-DD`).
pub fn format_date(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Whole seconds since the epoch, sub-second part truncated.
///
/// Two visit times collide when their keys are equal.
pub fn second_key(instant: &DateTime<Utc>) -> i64 {
    instant.timestamp()
}

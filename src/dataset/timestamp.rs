//! Lenient timestamp and date parsing.
//!
//! The source export is not consistent about how it spells instants, so the
//! loader accepts the handful of shapes seen in practice and drops the rest.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::error::QueryError;

// `%#z` takes `+02:00`, `+0200` and hour-only `+02`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y-%m-%dT%H:%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// An instant as written in the source, before any timezone normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Written {
    WithOffset(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

fn parse_written(raw: &str) -> Option<Written> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Written::WithOffset(dt));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(Written::WithOffset(dt));
        }
    }

    // A trailing `Z` with a space separator is not RFC 3339 but still UTC.
    let naive_part = s.strip_suffix('Z').unwrap_or(s);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive_part, fmt) {
            return Some(Written::Naive(dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(naive_part, fmt) {
            return d.and_hms_opt(0, 0, 0).map(Written::Naive);
        }
    }

    None
}

/// Parses a source timestamp into a UTC instant.
///
/// Instants with an offset are converted; naive ones are taken to be UTC
/// already. Returns `None` for anything unparsable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match parse_written(raw)? {
        Written::WithOffset(dt) => Some(dt.with_timezone(&Utc)),
        Written::Naive(dt) => Some(dt.and_utc()),
    }
}

/// Parses a caller-supplied date argument.
///
/// Plain dates are taken as-is. For a full timestamp the calendar date is the
/// one written, i.e. in the timestamp's own offset, not converted to UTC.
pub fn parse_query_date(raw: &str) -> Result<NaiveDate, QueryError> {
    match parse_written(raw) {
        Some(Written::WithOffset(dt)) => Ok(dt.date_naive()),
        Some(Written::Naive(dt)) => Ok(dt.date()),
        None => Err(QueryError::InvalidDate(raw.to_string())),
    }
}

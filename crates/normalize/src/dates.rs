//! ISO-8601 date normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse an upstream date or timestamp into a calendar date.
///
/// Upstream mixes bare dates (`2024-01-20`), zulu timestamps
/// (`2024-01-20T15:52:10Z`) and offset timestamps. Anything else, and any
/// non-Gregorian-valid value (e.g. `2023-02-30`), is `None`.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    None
}

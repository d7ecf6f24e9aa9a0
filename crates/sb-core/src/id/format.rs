//! Human-readable rendering of identifiers.

use chrono::{TimeZone, Utc};

use crate::id::parser;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Millisecond timestamps start well above any 9-digit identifier.
const MS_TIMESTAMP_FLOOR: u64 = 1_000_000_000_000;

/// Renders `id` for display. Total: every input produces a string.
///
/// Well-formed ids read like `"May 24, 2025 Day 1 #2"`. Legacy ids that
/// look like millisecond Unix timestamps render as a date-time; anything
/// else falls back to `"ID: <raw>"`.
pub fn format_id(id: u64) -> String {
    if let Some(parsed) = parser::parse(id) {
        return format!(
            "{} {}, {} Day {} #{}",
            MONTH_NAMES[(parsed.month - 1) as usize],
            parsed.day_of_month,
            parsed.year,
            parsed.gallery_day,
            parsed.sequence
        );
    }

    if id > MS_TIMESTAMP_FLOOR {
        if let Some(when) = i64::try_from(id)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        {
            return when.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        }
    }

    format!("ID: {id}")
}

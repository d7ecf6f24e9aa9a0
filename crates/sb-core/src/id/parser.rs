//! Decomposition of 9-digit identifiers back into their fields.

use chrono::NaiveDate;

/// The decoded fields of a well-formed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedId {
    /// Full Gregorian year (two-digit field plus 2000).
    pub year: i32,
    pub month: u32,
    pub day_of_month: u32,
    /// Gallery-day bucket, 1-9.
    pub gallery_day: u8,
    /// Intra-bucket sequence, the rightmost two digits.
    pub sequence: u32,
    /// The encoded calendar date.
    pub date: NaiveDate,
}

/// Decodes `id`, or returns `None` if it does not conform.
///
/// `None` is a recognition failure, not an error: legacy catalogs are full
/// of raw-timestamp ids, and migration probes every one of them. Rejected
/// inputs are anything that does not render as exactly 9 digits, a month
/// outside 1-12, a day-of-month outside 1-31, a bucket outside 1-9, or a
/// date that does not exist on the calendar (February 30th and friends).
pub fn parse(id: u64) -> Option<ParsedId> {
    let digits = id.to_string();
    if digits.len() != 9 {
        return None;
    }

    // u64 Display is all ASCII digits, so the field parses cannot fail;
    // the ok()? is belt for the slice boundaries staying in sync.
    let year = 2000 + digits[0..2].parse::<i32>().ok()?;
    let month = digits[2..4].parse::<u32>().ok()?;
    let day_of_month = digits[4..6].parse::<u32>().ok()?;
    let gallery_day = digits[6..7].parse::<u8>().ok()?;
    let sequence = digits[7..9].parse::<u32>().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day_of_month) {
        return None;
    }
    if !(1..=9).contains(&gallery_day) {
        return None;
    }

    // from_ymd_opt refuses impossible dates rather than normalizing them,
    // which is exactly the round-trip check the format requires.
    let date = NaiveDate::from_ymd_opt(year, month, day_of_month)?;

    Some(ParsedId {
        year,
        month,
        day_of_month,
        gallery_day,
        sequence,
        date,
    })
}

/// True iff `id` decodes to a valid date, bucket, and sequence.
pub fn is_well_formed(id: u64) -> bool {
    parse(id).is_some()
}

//! Allocation of fresh identifiers against a snapshot of the catalog.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};

use crate::error::{Error, Result};
use crate::models::ImageRecord;

/// Derives the next free identifier for `gallery_day` on the calendar day
/// of `upload_date`, colliding with nothing in `existing`.
///
/// The sequence is the smallest integer >= 1 not already taken for this
/// date+bucket prefix, so deleted images leave gaps that get refilled.
/// Fails with [`Error::InvalidBucket`] for a bucket outside 1-9 and with
/// [`Error::CapacityExceeded`] once a prefix holds 99 images.
///
/// Pure and side-effect free: the id is only unique against the records
/// the caller showed us, and persisting the new record is the caller's
/// responsibility. Callers that share the catalog must serialize their
/// read-allocate-write cycles (see `GalleryService`).
pub fn allocate(
    existing: &[ImageRecord],
    gallery_day: u8,
    upload_date: DateTime<Utc>,
) -> Result<u64> {
    if !(1..=9).contains(&gallery_day) {
        return Err(Error::InvalidBucket(gallery_day));
    }

    let prefix = format!(
        "{:02}{:02}{:02}{}",
        upload_date.year() % 100,
        upload_date.month(),
        upload_date.day(),
        gallery_day
    );

    let taken: BTreeSet<u32> = existing
        .iter()
        .filter_map(|record| record.id)
        .filter_map(|id| {
            let digits = format!("{:09}", id);
            if digits.len() == 9 && digits.starts_with(&prefix) {
                digits[7..9].parse().ok()
            } else {
                None
            }
        })
        .collect();

    let mut sequence: u32 = 1;
    while taken.contains(&sequence) {
        sequence += 1;
    }
    if sequence > 99 {
        return Err(Error::CapacityExceeded { prefix });
    }

    // Build the full 9-character string first and convert once at the end.
    // Arithmetic concatenation would silently drop the zero-padding of the
    // month, day, and sequence fields.
    let composed = format!("{prefix}{sequence:02}");
    Ok(composed.parse().expect("prefix and sequence are digits"))
}

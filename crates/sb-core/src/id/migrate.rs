//! Catalog upgrade: give every record a well-formed identifier.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::id::{allocator, parser};
use crate::models::ImageRecord;

/// Upgrades `records` so every entry carries a well-formed identifier for
/// `gallery_day`, preserving relative chronological order.
///
/// See [`migrate_at`]; this variant uses the current time as the fallback
/// date for records with an unparseable or missing `upload_date`.
pub fn migrate(records: Vec<ImageRecord>, gallery_day: u8) -> Result<Vec<ImageRecord>> {
    migrate_at(records, gallery_day, Utc::now())
}

/// [`migrate`] with an explicit fallback timestamp.
pub fn migrate_at(
    records: Vec<ImageRecord>,
    gallery_day: u8,
    now: DateTime<Utc>,
) -> Result<Vec<ImageRecord>> {
    migrate_reserving(records, gallery_day, &[], now)
}

/// [`migrate_at`] with ids outside the migrated set reserved as well.
///
/// The input is stable-sorted by parsed `upload_date` ascending before
/// processing, so allocation order matches chronological order; records
/// whose date does not parse sort earliest, ties keep their input order.
/// Each record is then handled in sequence, allocating against the
/// already-migrated output so later allocations see earlier ones:
///
/// - no id: allocate fresh for the record's upload date,
/// - well-formed id: keep verbatim,
/// - anything else (raw timestamps, hand-typed numbers): allocate fresh
///   and park the old value in `original_id` for traceability.
///
/// Ids kept verbatim are reserved before the pass starts, so a legacy
/// record that sorts earlier cannot steal a sequence a later record
/// already owns. `reserved` extends that set with records that are not
/// being migrated but whose ids must stay unique: a record moved to
/// another gallery day keeps its original bucket digit, so other days
/// can hold ids inside this day's prefix.
///
/// Never drops or merges records. A single allocation failure aborts the
/// whole batch, because a full date+bucket is a structural problem and
/// skipping a record would silently lose an image from the catalog.
/// Running the output through again is a no-op.
pub fn migrate_reserving(
    records: Vec<ImageRecord>,
    gallery_day: u8,
    reserved: &[ImageRecord],
    now: DateTime<Utc>,
) -> Result<Vec<ImageRecord>> {
    if !(1..=9).contains(&gallery_day) {
        return Err(crate::error::Error::InvalidBucket(gallery_day));
    }

    let mut sorted = records;
    sorted.sort_by_key(|record| record.upload_timestamp());

    // Ids that survive as-is are reserved up front: a legacy record that
    // sorts earlier must not allocate a sequence a kept record still owns.
    let mut reserved: Vec<ImageRecord> = reserved.to_vec();
    reserved.extend(
        sorted
            .iter()
            .filter(|r| r.id.is_some_and(parser::is_well_formed))
            .cloned(),
    );

    let mut migrated: Vec<ImageRecord> = Vec::with_capacity(sorted.len());
    for mut record in sorted {
        match record.id {
            Some(id) if parser::is_well_formed(id) => {}
            other => {
                let date = record.upload_timestamp().unwrap_or(now);
                let fresh = allocator::allocate(&reserved, gallery_day, date)?;
                record.id = Some(fresh);
                record.original_id = other;
                reserved.push(record.clone());
            }
        }
        migrated.push(record);
    }
    Ok(migrated)
}

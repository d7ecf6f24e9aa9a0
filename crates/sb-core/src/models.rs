//! # Domain Models
//!
//! These structs represent the core entities of Shutterbase.
//! Field names serialize in camelCase to stay wire-compatible with the
//! flat JSON catalog the legacy system wrote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the image catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// 9-digit date-coded identifier. `None` on legacy rows that were
    /// written before the identifier scheme existed; migration fills it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Pre-migration identifier, retained for traceability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<u64>,
    /// Gallery-day bucket, 1-9 (a user-facing grouping, not the calendar date).
    pub day: u8,
    /// ISO-8601 timestamp of when the blob was stored. Kept as the raw
    /// string the legacy system wrote; parse on demand via [`Self::upload_timestamp`].
    pub upload_date: String,
    #[serde(default)]
    pub title: String,
    pub thumbnail_url: String,
    pub full_url: String,
    /// Blob path inside the storage backend. Legacy field name on the wire.
    #[serde(rename = "gcsPath")]
    pub storage_path: String,
    /// At most one record per `day` may carry `true`. Enforced by the
    /// gallery service, not by the allocator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_highlight: Option<bool>,
}

impl ImageRecord {
    /// Parses `upload_date` as an RFC 3339 timestamp. Returns `None` for
    /// the unparseable strings some legacy rows carry.
    pub fn upload_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.upload_date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn is_highlighted(&self) -> bool {
        self.is_highlight.unwrap_or(false)
    }
}

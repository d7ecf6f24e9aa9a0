//! # Error
//!
//! Centralized error handling for the Shutterbase ecosystem.
//! Malformed identifiers are deliberately NOT represented here: the parser
//! returns `None` for them, because foreign id formats are an expected,
//! common case during migration, not an exceptional one.

use thiserror::Error;

/// The primary error type for all sb-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Gallery-day bucket outside the single-digit encoding slot.
    #[error("gallery day {0} is outside the valid range 1-9")]
    InvalidBucket(u8),

    /// A date+bucket prefix already holds its 99-image maximum. Wrapping
    /// past 99 would reuse a taken sequence, so this is a hard stop.
    #[error("capacity exceeded: date+bucket prefix {prefix} already holds 99 images")]
    CapacityExceeded { prefix: String },

    /// No catalog record carries the given identifier.
    #[error("image not found with ID {0}")]
    NotFound(u64),

    /// Blob storage collaborator failed (filesystem, object store, ...).
    #[error("blob storage error: {0}")]
    Storage(#[source] anyhow::Error),

    /// Metadata store collaborator failed (catalog read or write).
    #[error("metadata store error: {0}")]
    Metadata(#[source] anyhow::Error),
}

/// A specialized Result type for Shutterbase logic.
pub type Result<T> = std::result::Result<T, Error>;

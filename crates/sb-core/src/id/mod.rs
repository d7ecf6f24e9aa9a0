//! # Date-coded identifiers
//!
//! The 9-digit identifier scheme at the heart of the catalog. Read left to
//! right it concatenates: two-digit year, month, day-of-month, a one-digit
//! gallery-day bucket, and a two-digit sequence. `250524102` is the second
//! image uploaded on 2025-05-24 for gallery day 1.
//!
//! Identifiers sort chronologically as plain integers, which is what the
//! browsing layer relies on. Everything in this module is pure and
//! synchronous; persistence of an allocated id is the caller's job.

mod allocator;
mod format;
mod migrate;
mod parser;

pub use allocator::allocate;
pub use format::format_id;
pub use migrate::{migrate, migrate_at, migrate_reserving};
pub use parser::{is_well_formed, parse, ParsedId};

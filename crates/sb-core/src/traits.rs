//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be used by the
//! gallery service and the binary.

use crate::models::ImageRecord;
use async_trait::async_trait;

/// Blob persistence contract for full-resolution images and thumbnails.
///
/// Paths are relative, forward-slash separated (e.g. `day1/sunset.jpg`).
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `data` at `path`, creating intermediate directories/prefixes.
    async fn put(&self, path: &str, data: Vec<u8>) -> anyhow::Result<()>;

    /// Reads the blob at `path`.
    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>>;

    /// Removes the blob at `path`. Deleting a missing blob is not an error.
    async fn delete(&self, path: &str) -> anyhow::Result<()>;

    /// Lists blob paths under `prefix`.
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>>;

    /// Public URL for the blob at `path`.
    fn url_for(&self, path: &str) -> String;
}

/// Catalog persistence contract: the whole record list is read and written
/// as one document, so callers own the read-modify-write cycle.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Returns the full catalog. A store that has never been written
    /// returns the empty list.
    async fn read_all(&self) -> anyhow::Result<Vec<ImageRecord>>;

    /// Replaces the full catalog.
    async fn write_all(&self, records: &[ImageRecord]) -> anyhow::Result<()>;

    /// Drops any read cache so the next `read_all` hits the backing file.
    async fn invalidate(&self);
}

//! # sb-db-json
//!
//! Flat-file implementation of `MetadataStore`: the whole catalog is one
//! JSON array, read fully and written fully on every mutation, exactly the
//! document shape the legacy system left behind.
//!
//! The store carries its own read cache with a TTL. The cache is plain
//! state of this object, injected wherever the store is injected; there is
//! no module-level mutable state, and `invalidate` drops it explicitly.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use sb_core::models::ImageRecord;
use sb_core::traits::MetadataStore;

const DEFAULT_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    records: Vec<ImageRecord>,
    loaded_at: Instant,
}

pub struct JsonMetadataStore {
    path: PathBuf,
    ttl: Duration,
    cache: Mutex<Option<CacheEntry>>,
}

impl JsonMetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_ttl(path, DEFAULT_TTL)
    }

    /// A zero TTL disables caching entirely.
    pub fn with_ttl(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Loads the catalog from disk. A missing file is the empty catalog;
    /// anything that is not a JSON array is a hard error (the legacy
    /// filename-keyed map shape is not supported at runtime).
    async fn load(&self) -> anyhow::Result<Vec<ImageRecord>> {
        let raw = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<ImageRecord> = serde_json::from_slice(&raw).map_err(|e| {
            anyhow::anyhow!(
                "catalog {} is not a JSON array of records: {e}",
                self.path.display()
            )
        })?;
        debug!(count = records.len(), "catalog loaded from disk");
        Ok(records)
    }
}

#[async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn read_all(&self) -> anyhow::Result<Vec<ImageRecord>> {
        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.as_ref() {
            if entry.loaded_at.elapsed() < self.ttl {
                return Ok(entry.records.clone());
            }
        }

        let records = self.load().await?;
        *cache = Some(CacheEntry {
            records: records.clone(),
            loaded_at: Instant::now(),
        });
        Ok(records)
    }

    /// Writes the full catalog atomically: serialize to a sibling temp
    /// file, then rename over the real one. A crash mid-write can never
    /// leave a half-written catalog behind.
    async fn write_all(&self, records: &[ImageRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, &self.path).await?;

        // The mutation is also the invalidation point: refresh the cache
        // with what was just written.
        let mut cache = self.cache.lock().await;
        *cache = Some(CacheEntry {
            records: records.to_vec(),
            loaded_at: Instant::now(),
        });
        Ok(())
    }

    async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

//! # sb-storage-local
//!
//! Local filesystem implementation of `BlobStorage`. Blob paths are
//! relative, forward-slash separated (`day1/sunset.jpg`) and map directly
//! onto a directory tree under the configured root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sb_core::traits::BlobStorage;
use tokio::fs;

pub struct LocalBlobStore {
    /// Root directory for all blobs (e.g. "./data/images").
    root: PathBuf,
    /// Public URL prefix (e.g. "/static/images").
    url_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Maps a blob path onto the filesystem, refusing escapes from the root.
    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes || path.is_empty() {
            anyhow::bail!("invalid blob path: {path}");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStore {
    async fn put(&self, path: &str, data: Vec<u8>) -> anyhow::Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &data).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let target = self.resolve(path)?;
        Ok(fs::read(&target).await?)
    }

    /// Idempotent: deleting a blob that is already gone succeeds.
    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Walks the tree under `prefix` and returns blob paths, sorted.
    /// A prefix with no matching directory lists as empty.
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.resolve(prefix)?
        };
        if !start.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let entry_path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(entry_path);
                } else if let Ok(relative) = entry_path.strip_prefix(&self.root) {
                    found.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        found.sort();
        Ok(found)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url_prefix, path)
    }
}

//! Blob store for lesson materials and library files
//!
//! Only path resolution and a raw byte upload are offered. Paths are relative,
//! slash-separated, and may not escape the store root.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Reference returned after an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub path: String,
    pub url: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Absolute URL for `path`, or `None` when nothing is stored there
    async fn resolve_url(&self, path: &str) -> Result<Option<String>, StoreError>;

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, StoreError>;
}

/// Blob store rooted at a local directory, handing out `file://` URLs
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        if path.is_empty() {
            return Err(StoreError::InvalidPath("empty path".to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(StoreError::InvalidPath(path.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }

    fn url_for(full: &Path) -> String {
        format!("file://{}", full.display())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn resolve_url(&self, path: &str) -> Result<Option<String>, StoreError> {
        let full = self.full_path(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(Some(Self::url_for(&full))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, StoreError> {
        let full = self.full_path(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len() as u64;
        tokio::fs::write(&full, bytes).await?;
        debug!("stored blob {} ({} bytes)", path, size);
        Ok(BlobRef {
            path: path.to_string(),
            url: Self::url_for(&full),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_resolve() {
        let dir = TempDir::new().unwrap();
        let blobs = LocalBlobStore::new(dir.path());

        assert_eq!(blobs.resolve_url("books/algebra.pdf").await.unwrap(), None);

        let stored = blobs
            .upload("books/algebra.pdf", b"%PDF-1.4".to_vec())
            .await
            .unwrap();
        assert_eq!(stored.size, 8);
        assert!(stored.url.starts_with("file://"));

        let url = blobs.resolve_url("books/algebra.pdf").await.unwrap();
        assert_eq!(url, Some(stored.url));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let blobs = LocalBlobStore::new(dir.path());

        for bad in ["../secret", "/etc/passwd", ""] {
            let err = blobs.resolve_url(bad).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath(_)), "{}", bad);
        }
    }

    #[tokio::test]
    async fn test_directory_is_not_a_blob() {
        let dir = TempDir::new().unwrap();
        let blobs = LocalBlobStore::new(dir.path());
        blobs.upload("media/a.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(blobs.resolve_url("media").await.unwrap(), None);
    }
}

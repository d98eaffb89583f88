//! services/api/src/adapters/images.rs
//!
//! Filesystem-backed object bucket for custom emotion images. Objects are served
//! back to browsers from `/storage/{bucket}/...` by the web layer.

use async_trait::async_trait;
use mood_journal_core::ports::{ImageStore, PortError, PortResult};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

pub const EMOTION_IMAGES_BUCKET: &str = "emotion-images";

/// An `ImageStore` writing objects below `{root}/{bucket}`.
#[derive(Clone)]
pub struct FsImageStore {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl FsImageStore {
    pub fn new(root: PathBuf, bucket: &str, public_base_url: &str) -> Self {
        Self {
            root,
            bucket: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Directory the bucket's objects live in.
    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// Rejects absolute paths and `..` so objects stay inside the bucket.
    fn object_path(&self, path: &str) -> PortResult<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !safe {
            return Err(PortError::Unexpected(format!("Invalid object path: {}", path)));
        }
        Ok(self.bucket_dir().join(relative))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn upload(&self, path: &str, bytes: &[u8], _content_type: &str) -> PortResult<()> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(format!("Failed to create directory: {}", e)))?;
        }
        if fs::try_exists(&target).await.unwrap_or(false) {
            return Err(PortError::Conflict(format!("Object {} already exists", path)));
        }
        fs::write(&target, bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to store image: {}", e)))
    }

    async fn remove(&self, path: &str) -> PortResult<()> {
        let target = self.object_path(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(format!("Failed to remove image: {}", e))),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, self.bucket, path)
    }
}

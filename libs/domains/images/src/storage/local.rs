use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{BlobStore, BlobUrlFormatter, object_key};
use crate::error::{ImageError, ImageResult};
use crate::models::{BlobObject, ImageUpload, StorageLocator};

pub const LOCAL_PROVIDER: &str = "local";

const META_DIR: &str = ".meta";

#[derive(Debug, Serialize, Deserialize)]
struct BlobMeta {
    content_type: String,
    filename: String,
}

/// Blob store on the local filesystem.
///
/// Objects live at `{root}/{key}`; content type and original filename are kept
/// in a JSON sidecar under `{root}/.meta/{key}.json`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    urls: BlobUrlFormatter,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, urls: BlobUrlFormatter) -> Self {
        Self {
            root: root.into(),
            urls,
        }
    }

    /// Resolve a key below the root, refusing anything that could escape it.
    fn object_path(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(part) if part != META_DIR));
        safe.then(|| self.root.join(relative))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{}.json", key))
    }

    async fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await
    }
}

fn storage_error(action: &str, key: &str, err: std::io::Error) -> ImageError {
    ImageError::Storage(format!("Failed to {} '{}': {}", action, key, err))
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, upload: ImageUpload) -> ImageResult<StorageLocator> {
        let key = object_key(&upload.filename);
        let path = self
            .object_path(&key)
            .ok_or_else(|| ImageError::Internal(format!("Generated unsafe object key '{}'", key)))?;

        let meta = BlobMeta {
            content_type: upload
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            filename: upload.filename,
        };
        let meta_json = serde_json::to_vec(&meta)
            .map_err(|e| ImageError::Internal(format!("Failed to encode blob metadata: {}", e)))?;

        Self::write_file(&path, &upload.bytes)
            .await
            .map_err(|e| storage_error("write", &key, e))?;
        Self::write_file(&self.meta_path(&key), &meta_json)
            .await
            .map_err(|e| storage_error("write metadata for", &key, e))?;

        tracing::debug!(key = %key, bytes = upload.bytes.len(), "Stored blob on local disk");
        Ok(StorageLocator::new(LOCAL_PROVIDER, key))
    }

    async fn get(&self, locator: &StorageLocator) -> ImageResult<BlobObject> {
        let not_found = || ImageError::BlobNotFound {
            provider: locator.provider.clone(),
            key: locator.key.clone(),
        };

        if locator.provider != LOCAL_PROVIDER {
            return Err(not_found());
        }
        let path = self.object_path(&locator.key).ok_or_else(not_found)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(storage_error("read", &locator.key, e)),
        };

        let meta = match tokio::fs::read(self.meta_path(&locator.key)).await {
            Ok(raw) => serde_json::from_slice::<BlobMeta>(&raw).ok(),
            Err(_) => None,
        };
        let (content_type, filename) = match meta {
            Some(meta) => (meta.content_type, meta.filename),
            None => (
                "application/octet-stream".to_string(),
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
        };

        Ok(BlobObject {
            content_length: bytes.len() as u64,
            bytes,
            content_type,
            filename,
        })
    }

    async fn delete(&self, locator: &StorageLocator) -> ImageResult<()> {
        if locator.provider != LOCAL_PROVIDER {
            return Ok(());
        }
        let Some(path) = self.object_path(&locator.key) else {
            return Ok(());
        };

        for target in [path, self.meta_path(&locator.key)] {
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(storage_error("delete", &locator.key, e)),
            }
        }
        Ok(())
    }

    fn format_url(&self, locator: &StorageLocator) -> String {
        self.urls.format(locator)
    }
}

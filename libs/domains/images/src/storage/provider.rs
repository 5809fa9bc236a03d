use async_trait::async_trait;

use crate::error::ImageResult;
use crate::models::{BlobObject, ImageUpload, StorageLocator};

/// Durable object storage for uploaded images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist the upload and return where it was stored
    async fn put(&self, upload: ImageUpload) -> ImageResult<StorageLocator>;

    /// Fetch an object. Unknown provider or key is `BlobNotFound`.
    async fn get(&self, locator: &StorageLocator) -> ImageResult<BlobObject>;

    /// Best-effort removal, used to compensate a failed metadata write
    async fn delete(&self, locator: &StorageLocator) -> ImageResult<()>;

    /// Retrievable URL for a stored object
    fn format_url(&self, locator: &StorageLocator) -> String;
}

/// Builds download URLs served by the storage route of this service.
#[derive(Debug, Clone)]
pub struct BlobUrlFormatter {
    base_url: String,
}

impl BlobUrlFormatter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn format(&self, locator: &StorageLocator) -> String {
        format!(
            "{}/api/storage/{}/files/{}",
            self.base_url, locator.provider, locator.key
        )
    }
}

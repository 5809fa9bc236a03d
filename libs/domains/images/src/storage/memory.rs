use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{BlobStore, BlobUrlFormatter, object_key};
use crate::error::{ImageError, ImageResult};
use crate::models::{BlobObject, ImageUpload, StorageLocator};

pub const MEMORY_PROVIDER: &str = "memory";

/// Process-local blob store (for development/testing)
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, BlobObject>>>,
    urls: BlobUrlFormatter,
}

impl MemoryBlobStore {
    pub fn new(urls: BlobUrlFormatter) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            urls,
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, upload: ImageUpload) -> ImageResult<StorageLocator> {
        let key = object_key(&upload.filename);
        let object = BlobObject {
            content_length: upload.bytes.len() as u64,
            content_type: upload
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            filename: upload.filename,
            bytes: upload.bytes,
        };

        self.objects.write().await.insert(key.clone(), object);
        Ok(StorageLocator::new(MEMORY_PROVIDER, key))
    }

    async fn get(&self, locator: &StorageLocator) -> ImageResult<BlobObject> {
        let not_found = || ImageError::BlobNotFound {
            provider: locator.provider.clone(),
            key: locator.key.clone(),
        };

        if locator.provider != MEMORY_PROVIDER {
            return Err(not_found());
        }

        self.objects
            .read()
            .await
            .get(&locator.key)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete(&self, locator: &StorageLocator) -> ImageResult<()> {
        if locator.provider == MEMORY_PROVIDER {
            self.objects.write().await.remove(&locator.key);
        }
        Ok(())
    }

    fn format_url(&self, locator: &StorageLocator) -> String {
        self.urls.format(locator)
    }
}

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ImageResult;
use crate::models::Embedding;

/// Trait for embedding generation providers
///
/// Images and query text must land in the same vector space; the returned
/// `Embedding` carries the name of the model that produced it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for encoded image bytes
    async fn embed_image(&self, image: Bytes) -> ImageResult<Embedding>;

    /// Generate an embedding for a text query
    async fn embed_text(&self, text: &str) -> ImageResult<Embedding>;
}

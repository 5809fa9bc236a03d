use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::error::{ImageError, ImageResult};
use crate::fanout::try_join_cancellable;
use crate::models::{
    BlobObject, Embedding, FeedbackWithQuery, Image, ImageUpload, NewSearchFeedback,
    NewSearchQuery, Rating, SearchWithImage, StorageLocator, StoredImage, StoredSearch,
};
use crate::repository::ImageRepository;
use crate::storage::BlobStore;

/// Indexing and retrieval orchestration.
///
/// Holds the metadata store plus the two external capabilities; all three are
/// shared across requests.
pub struct ImageService<R: ImageRepository> {
    repository: Arc<R>,
    embeddings: Arc<dyn EmbeddingProvider>,
    blobs: Arc<dyn BlobStore>,
}

impl<R: ImageRepository> Clone for ImageService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            embeddings: self.embeddings.clone(),
            blobs: self.blobs.clone(),
        }
    }
}

fn check_embedding(embedding: &Embedding) -> ImageResult<()> {
    if embedding.model_name.is_empty() {
        return Err(ImageError::Embedding(
            "embedding is missing a model name".to_string(),
        ));
    }
    if embedding.values.is_empty() || embedding.values.iter().any(|v| !v.is_finite()) {
        return Err(ImageError::Embedding(format!(
            "model '{}' returned an empty or non-finite vector",
            embedding.model_name
        )));
    }
    if embedding.values.iter().all(|v| *v == 0.0) {
        return Err(ImageError::Embedding(format!(
            "model '{}' returned a zero vector",
            embedding.model_name
        )));
    }
    Ok(())
}

impl<R: ImageRepository> ImageService<R> {
    pub fn new(
        repository: R,
        embeddings: Arc<dyn EmbeddingProvider>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            repository: Arc::new(repository),
            embeddings,
            blobs,
        }
    }

    fn to_image(&self, stored: StoredImage) -> Image {
        let url = self.blobs.format_url(&stored.locator());
        Image::from_stored(stored, url)
    }

    fn to_search(&self, stored: StoredSearch) -> SearchWithImage {
        SearchWithImage {
            search: stored.query.into(),
            image: stored.image.map(|image| self.to_image(image)),
        }
    }

    /// Index an uploaded image.
    ///
    /// Embedding and blob upload run concurrently over the same buffered
    /// bytes; if either fails the other is cancelled. The image and embedding
    /// rows are then written in one transaction. If that write fails the
    /// uploaded blob is deleted on a best-effort basis.
    #[instrument(skip(self, upload), fields(filename = %upload.filename, bytes = upload.bytes.len()))]
    pub async fn create_image(&self, upload: ImageUpload) -> ImageResult<Image> {
        if upload.bytes.is_empty() {
            return Err(ImageError::Validation("uploaded file is empty".to_string()));
        }

        let embeddings = self.embeddings.clone();
        let image_bytes = upload.bytes.clone();
        let blobs = self.blobs.clone();

        let (embedding, locator) = try_join_cancellable(
            async move { embeddings.embed_image(image_bytes).await },
            async move { blobs.put(upload).await },
        )
        .await?;

        if let Err(e) = check_embedding(&embedding) {
            self.discard_blob(&locator).await;
            return Err(e);
        }

        let model_name = embedding.model_name.clone();
        let stored = match self
            .repository
            .create_image_with_embedding(locator.clone(), embedding)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.discard_blob(&locator).await;
                return Err(e);
            }
        };

        tracing::info!(image_id = %stored.id, model_name = %model_name, "Indexed image");
        Ok(self.to_image(stored))
    }

    async fn discard_blob(&self, locator: &StorageLocator) {
        if let Err(e) = self.blobs.delete(locator).await {
            tracing::warn!(
                provider = %locator.provider,
                key = %locator.key,
                error = %e,
                "Failed to delete orphaned blob"
            );
        }
    }

    /// Get an image by ID
    pub async fn get_image(&self, id: Uuid) -> ImageResult<Image> {
        let stored = self
            .repository
            .get_image(id)
            .await?
            .ok_or(ImageError::ImageNotFound(id))?;
        Ok(self.to_image(stored))
    }

    /// Find the stored image closest to `query_text` and record the search.
    ///
    /// Ties on distance go to the most recently indexed image. The matched
    /// image id is pinned before the search row is written.
    #[instrument(skip(self))]
    pub async fn search_image(&self, query_text: &str) -> ImageResult<SearchWithImage> {
        if query_text.trim().is_empty() {
            return Err(ImageError::Validation("query must not be empty".to_string()));
        }

        let embedding = self.embeddings.embed_text(query_text).await?;
        check_embedding(&embedding)?;

        let image_id = self
            .repository
            .nearest_image_for_model(&embedding.model_name, &embedding.values)
            .await?
            .ok_or_else(|| ImageError::NoImageAvailable(embedding.model_name.clone()))?;

        let stored = self
            .repository
            .create_search_query(NewSearchQuery {
                model_name: embedding.model_name,
                query_text: query_text.to_string(),
                embedding: embedding.values,
                result_image_id: Some(image_id),
            })
            .await?;

        tracing::info!(
            search_query_id = %stored.query.id,
            image_id = %image_id,
            "Search matched image"
        );
        Ok(self.to_search(stored))
    }

    /// Get a recorded search by ID
    pub async fn get_search_query(&self, id: Uuid) -> ImageResult<SearchWithImage> {
        let stored = self
            .repository
            .get_search_query(id)
            .await?
            .ok_or(ImageError::SearchQueryNotFound(id))?;
        Ok(self.to_search(stored))
    }

    /// Record feedback on a search. Only the first submission per query is accepted.
    #[instrument(skip(self))]
    pub async fn submit_feedback(
        &self,
        search_query_id: Uuid,
        rating: Rating,
    ) -> ImageResult<FeedbackWithQuery> {
        let stored = self
            .repository
            .create_search_feedback(NewSearchFeedback {
                search_query_id,
                rating,
            })
            .await?;
        Ok(stored.into())
    }

    /// Fetch a stored object for download
    pub async fn download(&self, provider: &str, key: &str) -> ImageResult<BlobObject> {
        self.blobs.get(&StorageLocator::new(provider, key)).await
    }
}

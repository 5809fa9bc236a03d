use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ImageError, ImageResult};
use crate::models::{
    Embedding, NewSearchFeedback, NewSearchQuery, SearchQuery, StorageLocator, StoredFeedback,
    StoredImage, StoredSearch,
};

/// Metadata and vector store for images, searches and feedback.
///
/// Implementations must:
/// - write an image and its embedding atomically
/// - order nearest neighbours by ascending cosine distance, then newest first
/// - reject a second feedback for the same query with `FeedbackAlreadyExists`
/// - reject feedback for an unknown query with `SearchQueryNotFound`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert an image row and its embedding row in one transaction
    async fn create_image_with_embedding(
        &self,
        locator: StorageLocator,
        embedding: Embedding,
    ) -> ImageResult<StoredImage>;

    async fn get_image(&self, id: Uuid) -> ImageResult<Option<StoredImage>>;

    /// Id of the image closest to `vector` among embeddings of `model_name`
    async fn nearest_image_for_model(
        &self,
        model_name: &str,
        vector: &[f32],
    ) -> ImageResult<Option<Uuid>>;

    async fn create_search_query(&self, input: NewSearchQuery) -> ImageResult<StoredSearch>;

    async fn get_search_query(&self, id: Uuid) -> ImageResult<Option<StoredSearch>>;

    async fn create_search_feedback(
        &self,
        input: NewSearchFeedback,
    ) -> ImageResult<StoredFeedback>;
}

/// Cosine distance as computed by pgvector's `<=>` operator.
///
/// Zero-norm vectors have no direction and yield NaN.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return f64::NAN;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Ordering key matching Postgres, where NaN sorts after every number.
fn distance_rank(distance: f64) -> f64 {
    if distance.is_nan() { f64::INFINITY } else { distance }
}

#[derive(Debug, Clone)]
struct EmbeddingRow {
    image_id: Uuid,
    model_name: String,
    values: Vec<f32>,
    created_at: DateTime<Utc>,
    id: Uuid,
}

#[derive(Debug, Default)]
struct Tables {
    images: HashMap<Uuid, StoredImage>,
    embeddings: Vec<EmbeddingRow>,
    searches: HashMap<Uuid, SearchQuery>,
    // keyed by search_query_id, mirrors the UNIQUE constraint
    feedback: HashMap<Uuid, StoredFeedback>,
}

impl Tables {
    fn search_with_image(&self, query: SearchQuery) -> StoredSearch {
        let image = query
            .result_image_id
            .and_then(|id| self.images.get(&id).cloned());
        StoredSearch { query, image }
    }
}

/// In-memory implementation of ImageRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryImageRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryImageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageRepository for InMemoryImageRepository {
    async fn create_image_with_embedding(
        &self,
        locator: StorageLocator,
        embedding: Embedding,
    ) -> ImageResult<StoredImage> {
        let mut tables = self.tables.write().await;

        let now = Utc::now();
        let image = StoredImage {
            id: Uuid::now_v7(),
            storage_provider: locator.provider,
            storage_key: locator.key,
            created_at: now,
        };

        tables.embeddings.push(EmbeddingRow {
            id: Uuid::now_v7(),
            image_id: image.id,
            model_name: embedding.model_name,
            values: embedding.values,
            created_at: now,
        });
        tables.images.insert(image.id, image.clone());

        tracing::info!(image_id = %image.id, "Created image");
        Ok(image)
    }

    async fn get_image(&self, id: Uuid) -> ImageResult<Option<StoredImage>> {
        let tables = self.tables.read().await;
        Ok(tables.images.get(&id).cloned())
    }

    async fn nearest_image_for_model(
        &self,
        model_name: &str,
        vector: &[f32],
    ) -> ImageResult<Option<Uuid>> {
        let tables = self.tables.read().await;

        let mut best: Option<(f64, &EmbeddingRow)> = None;
        for row in tables.embeddings.iter().filter(|r| r.model_name == model_name) {
            if row.values.len() != vector.len() {
                return Err(ImageError::Internal(format!(
                    "different vector dimensions {} and {}",
                    row.values.len(),
                    vector.len()
                )));
            }

            let distance = distance_rank(cosine_distance(&row.values, vector));
            let closer = match best {
                None => true,
                Some((best_distance, best_row)) => distance
                    .total_cmp(&best_distance)
                    .then_with(|| best_row.created_at.cmp(&row.created_at))
                    .then_with(|| best_row.id.cmp(&row.id))
                    == Ordering::Less,
            };
            if closer {
                best = Some((distance, row));
            }
        }

        Ok(best.map(|(_, row)| row.image_id))
    }

    async fn create_search_query(&self, input: NewSearchQuery) -> ImageResult<StoredSearch> {
        let mut tables = self.tables.write().await;

        if let Some(image_id) = input.result_image_id {
            if !tables.images.contains_key(&image_id) {
                return Err(ImageError::Internal(format!(
                    "search_queries.result_image_id references missing image {}",
                    image_id
                )));
            }
        }

        let query = SearchQuery {
            id: Uuid::now_v7(),
            model_name: input.model_name,
            query_text: input.query_text,
            result_image_id: input.result_image_id,
            created_at: Utc::now(),
        };
        tables.searches.insert(query.id, query.clone());

        tracing::info!(search_query_id = %query.id, "Created search query");
        Ok(tables.search_with_image(query))
    }

    async fn get_search_query(&self, id: Uuid) -> ImageResult<Option<StoredSearch>> {
        let tables = self.tables.read().await;
        Ok(tables
            .searches
            .get(&id)
            .cloned()
            .map(|query| tables.search_with_image(query)))
    }

    async fn create_search_feedback(
        &self,
        input: NewSearchFeedback,
    ) -> ImageResult<StoredFeedback> {
        let mut tables = self.tables.write().await;

        let query = tables
            .searches
            .get(&input.search_query_id)
            .cloned()
            .ok_or(ImageError::SearchQueryNotFound(input.search_query_id))?;

        if tables.feedback.contains_key(&input.search_query_id) {
            return Err(ImageError::FeedbackAlreadyExists(input.search_query_id));
        }

        let feedback = StoredFeedback {
            id: Uuid::now_v7(),
            search_query_id: input.search_query_id,
            rating: input.rating,
            created_at: Utc::now(),
            query,
        };
        tables
            .feedback
            .insert(feedback.search_query_id, feedback.clone());

        tracing::info!(
            search_query_id = %feedback.search_query_id,
            rating = %feedback.rating,
            "Recorded search feedback"
        );
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rating;

    fn locator(name: &str) -> StorageLocator {
        StorageLocator::new("memory", format!("images/test/{}", name))
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-9);
        // magnitude does not matter
        assert!(cosine_distance(&[2.0, 2.0], &[1.0, 1.0]).abs() < 1e-9);
        assert!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]).is_nan());
    }

    #[tokio::test]
    async fn test_nearest_ranks_zero_vector_last() {
        let repo = InMemoryImageRepository::new();
        let exact = repo
            .create_image_with_embedding(locator("cat.jpg"), Embedding::new("clip", vec![1.0, 0.0]))
            .await
            .unwrap();
        repo.create_image_with_embedding(locator("blank.jpg"), Embedding::new("clip", vec![0.0, 0.0]))
            .await
            .unwrap();

        let nearest = repo
            .nearest_image_for_model("clip", &[1.0, 0.0])
            .await
            .unwrap();
        assert_eq!(nearest, Some(exact.id));

        // a zero vector still beats nothing when it is all there is
        let only_blank = InMemoryImageRepository::new();
        let blank = only_blank
            .create_image_with_embedding(locator("blank.jpg"), Embedding::new("clip", vec![0.0, 0.0]))
            .await
            .unwrap();
        let nearest = only_blank
            .nearest_image_for_model("clip", &[1.0, 0.0])
            .await
            .unwrap();
        assert_eq!(nearest, Some(blank.id));
    }

    #[tokio::test]
    async fn test_create_and_get_image() {
        let repo = InMemoryImageRepository::new();
        let created = repo
            .create_image_with_embedding(locator("cat.jpg"), Embedding::new("clip", vec![1.0, 0.0]))
            .await
            .unwrap();

        let fetched = repo.get_image(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.storage_key, "images/test/cat.jpg");
        assert!(repo.get_image(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nearest_picks_smallest_distance_within_model() {
        let repo = InMemoryImageRepository::new();
        let cat = repo
            .create_image_with_embedding(locator("cat.jpg"), Embedding::new("clip", vec![1.0, 0.0]))
            .await
            .unwrap();
        repo.create_image_with_embedding(locator("dog.jpg"), Embedding::new("clip", vec![0.0, 1.0]))
            .await
            .unwrap();
        // closer, but indexed by another model
        repo.create_image_with_embedding(locator("x.jpg"), Embedding::new("other", vec![0.9, 0.1]))
            .await
            .unwrap();

        let nearest = repo
            .nearest_image_for_model("clip", &[0.9, 0.1])
            .await
            .unwrap();
        assert_eq!(nearest, Some(cat.id));
    }

    #[tokio::test]
    async fn test_nearest_tie_prefers_newest() {
        let repo = InMemoryImageRepository::new();
        repo.create_image_with_embedding(locator("a.jpg"), Embedding::new("clip", vec![1.0, 1.0]))
            .await
            .unwrap();
        let newer = repo
            .create_image_with_embedding(locator("b.jpg"), Embedding::new("clip", vec![1.0, 1.0]))
            .await
            .unwrap();

        let nearest = repo
            .nearest_image_for_model("clip", &[1.0, 1.0])
            .await
            .unwrap();
        assert_eq!(nearest, Some(newer.id));
    }

    #[tokio::test]
    async fn test_nearest_empty_model_returns_none() {
        let repo = InMemoryImageRepository::new();
        let nearest = repo.nearest_image_for_model("clip", &[1.0]).await.unwrap();
        assert!(nearest.is_none());
    }

    #[tokio::test]
    async fn test_feedback_once_per_query() {
        let repo = InMemoryImageRepository::new();
        let search = repo
            .create_search_query(NewSearchQuery {
                model_name: "clip".to_string(),
                query_text: "a cat".to_string(),
                embedding: vec![1.0],
                result_image_id: None,
            })
            .await
            .unwrap();

        let input = NewSearchFeedback {
            search_query_id: search.query.id,
            rating: Rating::Positive,
        };
        let first = repo.create_search_feedback(input.clone()).await.unwrap();
        assert_eq!(first.query.id, search.query.id);

        let second = repo.create_search_feedback(input).await;
        assert!(matches!(second, Err(ImageError::FeedbackAlreadyExists(id)) if id == search.query.id));

        let missing = Uuid::now_v7();
        let unknown = repo
            .create_search_feedback(NewSearchFeedback {
                search_query_id: missing,
                rating: Rating::Negative,
            })
            .await;
        assert!(matches!(unknown, Err(ImageError::SearchQueryNotFound(id)) if id == missing));
    }
}

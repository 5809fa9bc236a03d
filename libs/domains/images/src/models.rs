use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Where a blob lives: the provider that stored it plus its opaque key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocator {
    pub provider: String,
    pub key: String,
}

impl StorageLocator {
    pub fn new(provider: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            key: key.into(),
        }
    }
}

/// A vector produced by an embedding model, tagged with that model's name.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub model_name: String,
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(model_name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            model_name: model_name.into(),
            values,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

/// Raw upload handed to the indexing pipeline.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Persisted image row. The URL is resolved by the service on every read.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub id: Uuid,
    pub storage_provider: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

impl StoredImage {
    pub fn locator(&self) -> StorageLocator {
        StorageLocator::new(&self.storage_provider, &self.storage_key)
    }
}

/// Image as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Image {
    pub id: Uuid,
    pub storage_provider: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    /// Retrievable URL for the stored object
    pub url: String,
}

impl Image {
    pub fn from_stored(stored: StoredImage, url: String) -> Self {
        Self {
            id: stored.id,
            storage_provider: stored.storage_provider,
            storage_key: stored.storage_key,
            created_at: stored.created_at,
            url,
        }
    }
}

/// Input for recording a search
#[derive(Debug, Clone)]
pub struct NewSearchQuery {
    pub model_name: String,
    pub query_text: String,
    pub embedding: Vec<f32>,
    pub result_image_id: Option<Uuid>,
}

/// Persisted search query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub id: Uuid,
    pub model_name: String,
    pub query_text: String,
    pub result_image_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Search query joined with its matched image (if it still resolves).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSearch {
    pub query: SearchQuery,
    pub image: Option<StoredImage>,
}

/// Search metadata as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Search {
    pub id: Uuid,
    pub model_name: String,
    pub query_text: String,
    pub created_at: DateTime<Utc>,
}

impl From<SearchQuery> for Search {
    fn from(query: SearchQuery) -> Self {
        Self {
            id: query.id,
            model_name: query.model_name,
            query_text: query.query_text,
            created_at: query.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchWithImage {
    #[serde(flatten)]
    pub search: Search,
    pub image: Option<Image>,
}

/// Query string for `GET /images`
#[derive(Debug, Clone, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Free text describing the wanted image
    #[serde(default)]
    #[validate(length(min = 1, max = 1000))]
    pub query: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    Positive,
    Negative,
}

/// Body for `POST /images/{id}/feedback`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitFeedback {
    pub rating: Rating,
}

#[derive(Debug, Clone)]
pub struct NewSearchFeedback {
    pub search_query_id: Uuid,
    pub rating: Rating,
}

/// Persisted feedback row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFeedback {
    pub id: Uuid,
    pub search_query_id: Uuid,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
    pub query: SearchQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchFeedback {
    pub id: Uuid,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeedbackWithQuery {
    #[serde(flatten)]
    pub feedback: SearchFeedback,
    pub query: Search,
}

impl From<StoredFeedback> for FeedbackWithQuery {
    fn from(stored: StoredFeedback) -> Self {
        Self {
            feedback: SearchFeedback {
                id: stored.id,
                rating: stored.rating,
                created_at: stored.created_at,
            },
            query: stored.query.into(),
        }
    }
}

/// Blob contents plus the metadata needed to serve it back.
#[derive(Debug, Clone)]
pub struct BlobObject {
    pub bytes: Bytes,
    pub content_type: String,
    pub content_length: u64,
    pub filename: String,
}

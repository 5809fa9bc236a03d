use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, ErrorCode};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image not found: {0}")]
    ImageNotFound(Uuid),

    #[error("Search query not found: {0}")]
    SearchQueryNotFound(Uuid),

    #[error("No image available for model '{0}'")]
    NoImageAvailable(String),

    #[error("Feedback already submitted for search query {0}")]
    FeedbackAlreadyExists(Uuid),

    #[error("Object '{key}' not found in storage provider '{provider}'")]
    BlobNotFound { provider: String, key: String },

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Blob storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ImageResult<T> = Result<T, ImageError>;

impl ImageError {
    /// Failures raised by an external collaborator rather than by this service.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ImageError::Embedding(_) | ImageError::Storage(_))
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::ImageNotFound(id) => {
                AppError::domain(ErrorCode::ImageNotFound, format!("Image {} not found", id))
            }
            ImageError::SearchQueryNotFound(id) => AppError::domain(
                ErrorCode::SearchQueryNotFound,
                format!("Search query {} not found", id),
            ),
            ImageError::NoImageAvailable(model) => AppError::domain(
                ErrorCode::NoImageAvailable,
                format!("No indexed image is available for model '{}'", model),
            ),
            ImageError::FeedbackAlreadyExists(id) => AppError::domain(
                ErrorCode::SearchFeedbackAlreadyExists,
                format!("Feedback for search query {} already exists", id),
            ),
            ImageError::BlobNotFound { provider, key } => AppError::domain(
                ErrorCode::ObjectNotFound,
                format!("Object '{}' not found in '{}'", key, provider),
            ),
            ImageError::Embedding(msg) => {
                AppError::BadGateway(format!("Embedding provider failed: {}", msg))
            }
            ImageError::Storage(msg) => {
                AppError::BadGateway(format!("Blob storage failed: {}", msg))
            }
            ImageError::Validation(msg) => AppError::BadRequest(msg),
            ImageError::UploadTooLarge(msg) => AppError::PayloadTooLarge(msg),
            ImageError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ImageError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_not_found_variants_map_to_404() {
        let cases = [
            ImageError::ImageNotFound(Uuid::now_v7()),
            ImageError::SearchQueryNotFound(Uuid::now_v7()),
            ImageError::NoImageAvailable("clip".to_string()),
            ImageError::BlobNotFound {
                provider: "local".to_string(),
                key: "images/x/cat.jpg".to_string(),
            },
        ];

        for err in cases {
            assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_feedback_conflict_maps_to_409() {
        let response = ImageError::FeedbackAlreadyExists(Uuid::now_v7()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_upstream_failures_map_to_502() {
        let embedding = ImageError::Embedding("connection refused".to_string());
        let storage = ImageError::Storage("disk full".to_string());
        assert!(embedding.is_upstream());
        assert!(storage.is_upstream());
        assert_eq!(embedding.into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(storage.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_client_errors() {
        let validation = ImageError::Validation("query must not be empty".to_string());
        let too_large = ImageError::UploadTooLarge("limit is 10 bytes".to_string());
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            too_large.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_internal_maps_to_500() {
        let err = ImageError::Internal("Database error: boom".to_string());
        assert!(!err.is_upstream());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

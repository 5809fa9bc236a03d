//! Type-safe error codes for API responses.
//!
//! Each error code includes:
//! - String representation for client consumption (e.g., "VALIDATION_ERROR")
//! - Integer code for logging and monitoring (e.g., 1001)
//! - Default human-readable message
//! - The HTTP status it is served with
//!
//! # Example
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ValidationError;
//! assert_eq!(code.as_str(), "VALIDATION_ERROR");
//! assert_eq!(code.code(), 1001);
//! assert_eq!(code.default_message(), "Request validation failed");
//! ```

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standardized error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Request validation failed
    ValidationError,

    /// Invalid UUID format in path or query parameter
    InvalidUuid,

    /// Requested resource was not found
    NotFound,

    /// Request conflicts with current resource state (e.g., duplicate resource)
    Conflict,

    /// JSON extraction from request body failed
    JsonExtraction,

    /// Request body exceeds the configured limit
    PayloadTooLarge,

    // Server errors (1000s)
    /// An unexpected internal server error occurred
    InternalError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// A downstream dependency failed
    UpstreamFailure,

    // Image search errors (6000-6999)
    /// No image with the requested id
    ImageNotFound,

    /// No search query with the requested id
    SearchQueryNotFound,

    /// Nothing has been indexed for the embedding model in use
    NoImageAvailable,

    /// Feedback was already recorded for the search query
    SearchFeedbackAlreadyExists,

    /// No stored object under the requested provider and key
    ObjectNotFound,
}

impl ErrorCode {
    /// SCREAMING_SNAKE_CASE identifier clients can match on.
    ///
    /// ```rust
    /// use axum_helpers::errors::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
    /// assert_eq!(ErrorCode::NoImageAvailable.as_str(), "NO_IMAGE_AVAILABLE");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUuid => "INVALID_UUID",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::UpstreamFailure => "UPSTREAM_FAILURE",
            Self::ImageNotFound => "IMAGE_NOT_FOUND",
            Self::SearchQueryNotFound => "SEARCH_QUERY_NOT_FOUND",
            Self::NoImageAvailable => "NO_IMAGE_AVAILABLE",
            Self::SearchFeedbackAlreadyExists => "SEARCH_FEEDBACK_ALREADY_EXISTS",
            Self::ObjectNotFound => "OBJECT_NOT_FOUND",
        }
    }

    /// Integer code for structured logs and metrics.
    ///
    /// - 1000-1999: generic client and server errors
    /// - 6000-6999: image search errors
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidUuid => 1002,
            Self::JsonExtraction => 1003,
            Self::NotFound => 1004,
            Self::InternalError => 1005,
            Self::Conflict => 1008,
            Self::ServiceUnavailable => 1011,
            Self::PayloadTooLarge => 1012,
            Self::UpstreamFailure => 1013,

            Self::ImageNotFound => 6001,
            Self::SearchQueryNotFound => 6002,
            Self::NoImageAvailable => 6003,
            Self::SearchFeedbackAlreadyExists => 6004,
            Self::ObjectNotFound => 6005,
        }
    }

    /// Default user-facing message. Handlers may override it with detail.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidUuid => "Invalid UUID format",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource already exists",
            Self::JsonExtraction => "Failed to parse request body",
            Self::PayloadTooLarge => "Request body is too large",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::UpstreamFailure => "A downstream service failed",
            Self::ImageNotFound => "Image not found",
            Self::SearchQueryNotFound => "Search query not found",
            Self::NoImageAvailable => "No image available for the embedding model",
            Self::SearchFeedbackAlreadyExists => "Feedback already submitted for this search",
            Self::ObjectNotFound => "Stored object not found",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError | Self::InvalidUuid | Self::JsonExtraction => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound
            | Self::ImageNotFound
            | Self::SearchQueryNotFound
            | Self::NoImageAvailable
            | Self::ObjectNotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::SearchFeedbackAlreadyExists => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamFailure => StatusCode::BAD_GATEWAY,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_string_representation() {
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(
            ErrorCode::SearchFeedbackAlreadyExists.as_str(),
            "SEARCH_FEEDBACK_ALREADY_EXISTS"
        );
    }

    #[test]
    fn test_error_code_integer_codes() {
        assert_eq!(ErrorCode::ValidationError.code(), 1001);
        assert_eq!(ErrorCode::ImageNotFound.code(), 6001);
        assert_eq!(ErrorCode::ObjectNotFound.code(), 6005);
    }

    #[test]
    fn test_domain_codes_carry_http_status() {
        assert_eq!(ErrorCode::NoImageAvailable.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::SearchFeedbackAlreadyExists.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::UpstreamFailure.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::ValidationError.to_string(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_error_code_serde() {
        let json = serde_json::to_string(&ErrorCode::NoImageAvailable).unwrap();
        assert_eq!(json, "\"NO_IMAGE_AVAILABLE\"");

        let code: ErrorCode = serde_json::from_str("\"IMAGE_NOT_FOUND\"").unwrap();
        assert_eq!(code, ErrorCode::ImageNotFound);
    }
}

//! Images Domain
//!
//! Text-to-image search: uploaded images are embedded and stored, free-text
//! queries are embedded with the same model and matched to the closest image
//! by cosine distance, and each search can be rated once.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints (multipart upload, search, feedback, download)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐      ┌────────────────────┐
//! │   Service   │ ───▶ │ EmbeddingProvider  │  ← CLIP over gRPC
//! │             │ ───▶ │ BlobStore          │  ← local disk / memory
//! └──────┬──────┘      └────────────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← images, embeddings, searches, feedback (trait + implementations)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs, enums
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_images::{
//!     handlers,
//!     repository::InMemoryImageRepository,
//!     service::ImageService,
//!     storage::{BlobUrlFormatter, MemoryBlobStore},
//!     ClipConfig, ClipGrpcProvider,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let clip = ClipGrpcProvider::connect_lazy(&ClipConfig {
//!     address: "http://localhost:50051".to_string(),
//!     request_timeout_secs: 30,
//! })?;
//! let blobs = MemoryBlobStore::new(BlobUrlFormatter::new("http://localhost:8080"));
//!
//! let service = ImageService::new(
//!     InMemoryImageRepository::new(),
//!     Arc::new(clip),
//!     Arc::new(blobs),
//! );
//! let router = handlers::router(service, 10 * 1024 * 1024);
//! # Ok(())
//! # }
//! ```

pub mod embedding;
pub mod error;
pub mod fanout;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use embedding::{ClipConfig, ClipGrpcProvider, EmbeddingProvider};
pub use error::{ImageError, ImageResult};
pub use handlers::{ApiDoc, StorageApiDoc};
pub use models::{
    BlobObject, Embedding, FeedbackWithQuery, Image, ImageUpload, Rating, Search, SearchParams,
    SearchWithImage, StorageLocator, SubmitFeedback,
};
pub use postgres::PgImageRepository;
pub use repository::{ImageRepository, InMemoryImageRepository};
pub use service::ImageService;
pub use storage::{BlobStore, BlobUrlFormatter, LocalBlobStore, MemoryBlobStore};

use async_trait::async_trait;
use bytes::Bytes;
use core_config::{ConfigError, FromEnv, env_parse, env_required};
use protos::CLIP_IMAGE_CHUNK_SIZE;
use protos::clip::clip_service_client::ClipServiceClient;
use protos::clip::{EmbeddingResponse, ImageChunk, Text};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

use super::EmbeddingProvider;
use crate::error::{ImageError, ImageResult};
use crate::models::Embedding;

/// CLIP gRPC provider configuration
#[derive(Debug, Clone)]
pub struct ClipConfig {
    /// e.g. `http://clip:50051`
    pub address: String,
    pub request_timeout_secs: u64,
}

impl ClipConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            request_timeout_secs: 30,
        }
    }
}

impl FromEnv for ClipConfig {
    /// - CLIP_GRPC_ADDR: required
    /// - CLIP_REQUEST_TIMEOUT_SECS: defaults to 30
    fn from_env() -> Result<Self, ConfigError> {
        let address = env_required("CLIP_GRPC_ADDR")?;
        let request_timeout_secs = env_parse("CLIP_REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            address,
            request_timeout_secs,
        })
    }
}

/// Embeddings from a remote CLIP model over gRPC (`clip.CLIPService`).
///
/// Images are streamed to the server in 64 KiB chunks.
#[derive(Debug, Clone)]
pub struct ClipGrpcProvider {
    client: ClipServiceClient<Channel>,
}

impl ClipGrpcProvider {
    /// Build a provider whose channel connects on first use.
    pub fn connect_lazy(config: &ClipConfig) -> ImageResult<Self> {
        let endpoint = Endpoint::from_shared(config.address.clone())
            .map_err(|e| {
                ImageError::Embedding(format!(
                    "Invalid CLIP address '{}': {}",
                    config.address, e
                ))
            })?
            .timeout(Duration::from_secs(config.request_timeout_secs));

        tracing::info!(address = %config.address, "Configured CLIP embedding provider");
        Ok(Self {
            client: ClipServiceClient::new(endpoint.connect_lazy()),
        })
    }
}

/// Split an image into the chunk sequence sent on the `ImageEmbedding` stream.
pub(crate) fn image_chunks(image: &Bytes) -> Vec<ImageChunk> {
    (0..image.len())
        .step_by(CLIP_IMAGE_CHUNK_SIZE)
        .map(|start| ImageChunk {
            data: image.slice(start..(start + CLIP_IMAGE_CHUNK_SIZE).min(image.len())),
        })
        .collect()
}

fn into_embedding(response: EmbeddingResponse) -> ImageResult<Embedding> {
    if response.model_name.is_empty() {
        return Err(ImageError::Embedding(
            "CLIP response is missing the model name".to_string(),
        ));
    }
    if response.embedding.is_empty() {
        return Err(ImageError::Embedding(format!(
            "CLIP model '{}' returned an empty embedding",
            response.model_name
        )));
    }
    if response.embedding.iter().any(|v| !v.is_finite()) {
        return Err(ImageError::Embedding(format!(
            "CLIP model '{}' returned a non-finite embedding",
            response.model_name
        )));
    }
    Ok(Embedding::new(response.model_name, response.embedding))
}

fn status_error(status: tonic::Status) -> ImageError {
    ImageError::Embedding(format!(
        "CLIP call failed ({:?}): {}",
        status.code(),
        status.message()
    ))
}

#[async_trait]
impl EmbeddingProvider for ClipGrpcProvider {
    async fn embed_image(&self, image: Bytes) -> ImageResult<Embedding> {
        let chunks = image_chunks(&image);
        tracing::debug!(bytes = image.len(), chunks = chunks.len(), "Streaming image to CLIP");

        let response = self
            .client
            .clone()
            .image_embedding(tokio_stream::iter(chunks))
            .await
            .map_err(status_error)?;

        into_embedding(response.into_inner())
    }

    async fn embed_text(&self, text: &str) -> ImageResult<Embedding> {
        let response = self
            .client
            .clone()
            .text_embedding(Text {
                text: text.to_string(),
            })
            .await
            .map_err(status_error)?;

        into_embedding(response.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_chunks_split_at_64k() {
        let image = Bytes::from(vec![7u8; CLIP_IMAGE_CHUNK_SIZE * 2 + 10]);
        let chunks = image_chunks(&image);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.len(), CLIP_IMAGE_CHUNK_SIZE);
        assert_eq!(chunks[1].data.len(), CLIP_IMAGE_CHUNK_SIZE);
        assert_eq!(chunks[2].data.len(), 10);
    }

    #[test]
    fn test_image_chunks_small_and_empty() {
        assert_eq!(image_chunks(&Bytes::from_static(b"abc")).len(), 1);
        assert!(image_chunks(&Bytes::new()).is_empty());
    }

    #[test]
    fn test_into_embedding_validates_response() {
        let ok = into_embedding(EmbeddingResponse {
            model_name: "clip-vit".to_string(),
            embedding: vec![0.1, 0.2],
        })
        .unwrap();
        assert_eq!(ok.model_name, "clip-vit");
        assert_eq!(ok.dimensions(), 2);

        let unnamed = into_embedding(EmbeddingResponse {
            model_name: String::new(),
            embedding: vec![0.1],
        });
        assert!(matches!(unnamed, Err(ImageError::Embedding(_))));

        let empty = into_embedding(EmbeddingResponse {
            model_name: "clip-vit".to_string(),
            embedding: vec![],
        });
        assert!(matches!(empty, Err(ImageError::Embedding(_))));

        let nan = into_embedding(EmbeddingResponse {
            model_name: "clip-vit".to_string(),
            embedding: vec![f32::NAN],
        });
        assert!(matches!(nan, Err(ImageError::Embedding(_))));
    }

    #[test]
    fn test_clip_config_from_env() {
        temp_env::with_vars(
            [
                ("CLIP_GRPC_ADDR", Some("http://localhost:50051")),
                ("CLIP_REQUEST_TIMEOUT_SECS", None::<&str>),
            ],
            || {
                let config = ClipConfig::from_env().unwrap();
                assert_eq!(config.address, "http://localhost:50051");
                assert_eq!(config.request_timeout_secs, 30);
            },
        );
    }

    #[test]
    fn test_clip_config_requires_address() {
        temp_env::with_var_unset("CLIP_GRPC_ADDR", || {
            let err = ClipConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("CLIP_GRPC_ADDR"));
        });
    }

    #[tokio::test]
    async fn test_connect_lazy_rejects_invalid_address() {
        let result = ClipGrpcProvider::connect_lazy(&ClipConfig::new("not a uri"));
        assert!(matches!(result, Err(ImageError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_error() {
        // port 9 (discard) is not a gRPC server
        let provider =
            ClipGrpcProvider::connect_lazy(&ClipConfig::new("http://127.0.0.1:9")).unwrap();
        let result = provider.embed_text("a cat").await;
        assert!(matches!(result, Err(ImageError::Embedding(_))));
    }
}

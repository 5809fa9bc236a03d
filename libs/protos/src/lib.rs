//! Protobuf types and gRPC clients generated from `proto/` with `buf generate`.
//!
//! Regenerate after editing a `.proto` file:
//!
//! ```text
//! cd libs/protos && buf generate
//! ```

pub mod clip {
    include!("generated/clip/clip.rs");
}

/// Size of each `ImageChunk` sent on the `ImageEmbedding` stream.
pub const CLIP_IMAGE_CHUNK_SIZE: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::clip::{EmbeddingResponse, ImageChunk, Text};
    use prost::Message;

    #[test]
    fn test_embedding_response_wire_format() {
        let response = EmbeddingResponse {
            model_name: "clip-vit-base-patch32".to_string(),
            embedding: vec![0.5, -1.0],
        };

        let decoded = EmbeddingResponse::decode(response.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.model_name, "clip-vit-base-patch32");
        assert_eq!(decoded.embedding, vec![0.5, -1.0]);
    }

    #[test]
    fn test_chunk_and_text_field_tags() {
        // field 1, wire type 2 (length-delimited) => tag byte 0x0a
        let chunk = ImageChunk {
            data: prost::bytes::Bytes::from_static(b"abc"),
        };
        assert_eq!(chunk.encode_to_vec(), vec![0x0a, 3, b'a', b'b', b'c']);

        let text = Text {
            text: "cat".to_string(),
        };
        assert_eq!(text.encode_to_vec(), vec![0x0a, 3, b'c', b'a', b't']);
    }
}

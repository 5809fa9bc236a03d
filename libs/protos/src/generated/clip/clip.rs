// @generated
// This file is @generated by prost-build.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageChunk {
    #[prost(bytes="bytes", tag="1")]
    pub data: ::prost::bytes::Bytes,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Text {
    #[prost(string, tag="1")]
    pub text: ::prost::alloc::string::String,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmbeddingResponse {
    #[prost(string, tag="1")]
    pub model_name: ::prost::alloc::string::String,
    #[prost(float, repeated, tag="2")]
    pub embedding: ::prost::alloc::vec::Vec<f32>,
}
include!("clip.tonic.rs");
// @@protoc_insertion_point(module)

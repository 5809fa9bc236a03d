mod clip;
mod provider;

pub use clip::{ClipConfig, ClipGrpcProvider};
pub use provider::EmbeddingProvider;
#[cfg(test)]
pub use provider::MockEmbeddingProvider;

//! Custom extractors that reject bad input with the standard error body.

pub mod uuid_path;
pub mod validated_json;

pub use uuid_path::UuidPath;
pub use validated_json::{ValidatedJson, ValidatedQuery};

//! Blob storage capability and the providers shipped with the service.

mod local;
mod memory;
mod provider;

pub use local::{LocalBlobStore, LOCAL_PROVIDER};
pub use memory::{MemoryBlobStore, MEMORY_PROVIDER};
pub use provider::{BlobStore, BlobUrlFormatter};
#[cfg(test)]
pub use provider::MockBlobStore;

use uuid::Uuid;

/// Object key for a new upload: `images/{random id}/{sanitized filename}`.
pub fn object_key(filename: &str) -> String {
    format!("images/{}/{}", Uuid::new_v4().simple(), sanitize_filename(filename))
}

/// Reduce a client supplied filename to a single safe path segment.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("cat.jpg"), "cat.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[test]
    fn test_object_key_layout() {
        let key = object_key("cat.jpg");
        let parts: Vec<&str> = key.split('/').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "images");
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2], "cat.jpg");
        assert_ne!(object_key("cat.jpg"), key);
    }
}

//! Blob storage for image bytes, keyed by the relative paths in
//! [`imageflow_core::models::VariantPaths`].

/// Local filesystem backend.
pub mod filesystem;
/// Volatile backend for tests.
pub mod memory;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;

use crate::AppError;
use async_trait::async_trait;
use axum::body::Bytes;

/// Errors raised by blob backends.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid blob key: {0}")]
    InvalidKey(String),
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::InvalidKey(message) => AppError::Validation(message),
            BlobError::Io(err) => AppError::Storage(err.to_string()),
        }
    }
}

/// Stored bytes plus the content type they are served with.
#[derive(Debug, Clone)]
pub struct Blob {
    pub data: Bytes,
    pub content_type: String,
}

/// Object storage for image bytes.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store `data` under `key`, replacing any previous value.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError>;

    /// Fetch `key`. Absent keys are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobError>;

    /// Remove `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;

    /// Backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}

/// Content type implied by a key's extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Reject keys that could escape the storage root.
pub(crate) fn validate_key(key: &str) -> Result<(), BlobError> {
    if key.is_empty() {
        return Err(BlobError::InvalidKey("empty key".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(BlobError::InvalidKey(format!(
            "path traversal not allowed: {}",
            key
        )));
    }
    for component in std::path::Path::new(key).components() {
        if !matches!(component, std::path::Component::Normal(_)) {
            return Err(BlobError::InvalidKey(format!(
                "contains unsafe path component: {}",
                key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for_key("original/landscape/a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_key("original/landscape/a.JPG"), "image/jpeg");
        assert_eq!(content_type_for_key("portrait/webp/a.webp"), "image/webp");
        assert_eq!(content_type_for_key("portrait/avif/a.avif"), "image/avif");
        assert_eq!(content_type_for_key("notes.txt"), "application/octet-stream");
        assert_eq!(content_type_for_key("no-extension"), "application/octet-stream");
    }

    #[test]
    fn validate_key_rejects_traversal() {
        assert!(validate_key("original/portrait/a.png").is_ok());
        for bad in ["", "../etc/passwd", "/abs/path.png", "a/../../b", "a\\b", "./a.png"] {
            assert!(
                matches!(validate_key(bad), Err(BlobError::InvalidKey(_))),
                "key: {:?}",
                bad
            );
        }
    }
}

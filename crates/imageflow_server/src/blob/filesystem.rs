//! Blob store rooted in a local directory.

use super::{content_type_for_key, validate_key, Blob, BlobError, BlobStore};
use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Stores each blob as a file at `<root>/<key>`.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Create the root directory if needed.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // Write to a sibling temp file first so readers never see a partial blob.
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
        if let Err(err) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobError> {
        let path = self.key_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Blob {
                data: Bytes::from(data),
                content_type: content_type_for_key(key).to_string(),
            })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

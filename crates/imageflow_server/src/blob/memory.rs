use super::{content_type_for_key, validate_key, Blob, BlobError, BlobStore};
use async_trait::async_trait;
use axum::body::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Blob store held in process memory.
///
/// Keys registered with [`MemoryBlobStore::fail_deletes_for`] make `delete`
/// fail, which lets callers exercise partial-failure paths.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_deletes_for(&self, key: &str) {
        if let Ok(mut failing) = self.failing_deletes.lock() {
            failing.insert(key.to_string());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> BlobError {
    BlobError::Io(std::io::Error::other("memory blob store lock poisoned"))
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError> {
        validate_key(key)?;
        self.blobs
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobError> {
        validate_key(key)?;
        let blobs = self.blobs.lock().map_err(|_| poisoned())?;
        Ok(blobs.get(key).map(|data| Blob {
            data: data.clone(),
            content_type: content_type_for_key(key).to_string(),
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        validate_key(key)?;
        if self
            .failing_deletes
            .lock()
            .map_err(|_| poisoned())?
            .contains(key)
        {
            return Err(BlobError::Io(std::io::Error::other(format!(
                "delete refused for {}",
                key
            ))));
        }
        self.blobs.lock().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

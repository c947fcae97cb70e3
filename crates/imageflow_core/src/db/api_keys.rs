//! API key registry stored under `api_keys`.

use super::{get_json, keys, put_json, KvStore};
use crate::error::AppError;
use crate::locks::KeyLocks;
use std::sync::Arc;

/// Validates bearer keys against the stored list and the static keys from
/// configuration.
pub struct ApiKeyStore {
    kv: Arc<dyn KvStore>,
    locks: Arc<KeyLocks>,
    static_keys: Vec<String>,
}

impl ApiKeyStore {
    pub fn new(kv: Arc<dyn KvStore>, locks: Arc<KeyLocks>, static_keys: Vec<String>) -> Self {
        Self {
            kv,
            locks,
            static_keys,
        }
    }

    /// Keys registered in the store (static keys excluded).
    pub async fn list(&self) -> Result<Vec<String>, AppError> {
        Ok(get_json::<Vec<String>>(self.kv.as_ref(), keys::API_KEYS)
            .await?
            .unwrap_or_default())
    }

    /// Returns `true` when `candidate` matches a static or registered key.
    /// Blank candidates never match.
    pub async fn validate(&self, candidate: &str) -> Result<bool, AppError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Ok(false);
        }
        if self.static_keys.iter().any(|key| key == candidate) {
            return Ok(true);
        }
        Ok(self.list().await?.iter().any(|key| key == candidate))
    }

    /// Register a key.
    ///
    /// # Returns
    /// `false` when the key was already registered.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] for blank keys.
    pub async fn add(&self, key: &str) -> Result<bool, AppError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Validation("API key cannot be empty".to_string()));
        }
        let _guard = self.locks.lock(keys::API_KEYS).await;
        let mut registered = self.list().await?;
        if registered.iter().any(|existing| existing == key) {
            return Ok(false);
        }
        registered.push(key.to_string());
        put_json(self.kv.as_ref(), keys::API_KEYS, &registered).await?;
        Ok(true)
    }

    /// Unregister a key.
    ///
    /// # Returns
    /// `false` when the key was not registered.
    pub async fn remove(&self, key: &str) -> Result<bool, AppError> {
        let _guard = self.locks.lock(keys::API_KEYS).await;
        let mut registered = self.list().await?;
        let before = registered.len();
        registered.retain(|existing| existing != key);
        if registered.len() == before {
            return Ok(false);
        }
        put_json(self.kv.as_ref(), keys::API_KEYS, &registered).await?;
        Ok(true)
    }
}

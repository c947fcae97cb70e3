//! Key-value storage layer for ImageFlow.
//!
//! All metadata lives in a flat string-keyed store holding JSON values. The
//! [`KvStore`] trait is the only seam the index talks to; [`RedbKv`] backs the
//! server and [`MemoryKv`] backs tests.

/// API key registry.
pub mod api_keys;
/// KV key builders.
pub mod keys;
/// In-memory backend.
pub mod memory;
/// redb backend.
pub mod redb_kv;
/// Stored upload-settings override.
pub mod settings;
/// redb table definitions.
pub mod tables;


pub use api_keys::ApiKeyStore;
pub use memory::MemoryKv;
pub use redb_kv::RedbKv;

use crate::error::AppError;
use crate::index::ImageIndex;
use crate::locks::KeyLocks;
use crate::Config;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Minimal key-value contract: single-key reads and writes plus a prefix
/// scan. No multi-key atomicity is assumed.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Read the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), AppError>;

    /// Remove `key`.
    ///
    /// # Returns
    /// `true` when a value was present.
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Every key starting with `prefix`, in ascending key order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Read and decode a JSON value.
///
/// # Errors
/// Returns [`AppError::Serialization`] when the stored bytes are not valid
/// JSON for `T`.
pub async fn get_json<T: DeserializeOwned>(
    kv: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, AppError> {
    match kv.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it.
pub async fn put_json<T: Serialize + ?Sized>(
    kv: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), AppError> {
    let bytes = serde_json::to_vec(value)?;
    kv.put(key, bytes).await
}

/// Database handle bundling the KV backend with the services built on it.
pub struct Database {
    pub kv: Arc<dyn KvStore>,
    pub images: ImageIndex,
    pub api_keys: ApiKeyStore,
}

impl Database {
    /// Open (or create) the redb store under `config.db_path`.
    ///
    /// # Errors
    /// Returns an error when the directory or database file cannot be opened.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let kv: Arc<dyn KvStore> = Arc::new(RedbKv::open(&config.db_path)?);
        Ok(Self::from_kv(kv, config))
    }

    /// Volatile store, used by tests and dry runs.
    pub fn in_memory(config: &Config) -> Self {
        Self::from_kv(Arc::new(MemoryKv::new()), config)
    }

    /// Wire the index and key registry onto an existing backend.
    pub fn from_kv(kv: Arc<dyn KvStore>, config: &Config) -> Self {
        let locks = Arc::new(KeyLocks::new());
        Self {
            images: ImageIndex::new(kv.clone(), locks.clone(), config.rename_policy),
            api_keys: ApiKeyStore::new(kv.clone(), locks, config.api_keys.clone()),
            kv,
        }
    }
}

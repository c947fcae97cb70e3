//! redb-backed [`KvStore`].

use super::tables::KV;
use super::KvStore;
use crate::constants::REDB_FILE_NAME;
use crate::error::AppError;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable};
use std::path::Path;
use std::sync::Arc;

/// Durable store using a single redb table.
///
/// Every call runs its own transaction on the blocking pool, so each single
/// key write is atomic and durable on return.
#[derive(Clone)]
pub struct RedbKv {
    db: Arc<Database>,
}

impl RedbKv {
    /// Open or create `<db_path>/metadata.redb`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or redb fails to
    /// open the file.
    pub fn open(db_path: &str) -> Result<Self, AppError> {
        std::fs::create_dir_all(db_path).map_err(|err| {
            AppError::Storage(format!(
                "Failed to create database directory '{}': {}",
                db_path, err
            ))
        })?;
        let file = Path::new(db_path).join(REDB_FILE_NAME);
        let db = Database::create(&file)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(KV)?;
        }
        write_txn.commit()?;

        tracing::debug!("Opened redb store at {}", file.display());
        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, AppError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|err| AppError::Storage(format!("Blocking task failed: {}", err)))?
    }
}

#[async_trait]
impl KvStore for RedbKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let key = key.to_string();
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(KV)?;
            let value = table.get(key.as_str())?.map(|guard| guard.value().to_vec());
            Ok(value)
        })
        .await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), AppError> {
        let key = key.to_string();
        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(KV)?;
                table.insert(key.as_str(), value.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let key = key.to_string();
        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            let removed = {
                let mut table = write_txn.open_table(KV)?;
                let removed = table.remove(key.as_str())?.is_some();
                removed
            };
            write_txn.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let prefix = prefix.to_string();
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(KV)?;
            let mut keys = Vec::new();
            for item in table.range(prefix.as_str()..)? {
                let (key, _) = item?;
                let key = key.value();
                if !key.starts_with(prefix.as_str()) {
                    break;
                }
                keys.push(key.to_string());
            }
            Ok(keys)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "redb"
    }
}

//! Metadata index over the KV store.
//!
//! Records live under `image:<id>`; id lists (`image_ids`,
//! `image_ids:<orientation>`, `tag:<name>`) and the `tags` registry point at
//! them. The KV store has no multi-key transactions, so every mutation writes
//! in an order that never leaves a list entry pointing at a record that does
//! not carry the matching attribute. Interrupted sequences can leave records
//! that are not fully indexed; [`ImageIndex::repair_indexes`] fixes both
//! directions.

mod mutation;
mod query;
mod repair;
mod tags;

#[cfg(test)]
mod tests;

pub use repair::RepairReport;

use crate::db::{get_json, keys, put_json, KvStore};
use crate::error::AppError;
use crate::locks::KeyLocks;
use crate::models::{ImageRecord, Orientation, RenamePolicy};
use std::sync::Arc;

/// Index operations. Cheap to share behind an `Arc`.
pub struct ImageIndex {
    kv: Arc<dyn KvStore>,
    locks: Arc<KeyLocks>,
    rename_policy: RenamePolicy,
}

/// One of the id lists maintained by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexList {
    All,
    Orientation(Orientation),
    Tag(String),
}

impl IndexList {
    pub fn key(&self) -> String {
        match self {
            Self::All => keys::IMAGE_IDS.to_string(),
            Self::Orientation(orientation) => keys::orientation_ids(*orientation),
            Self::Tag(name) => keys::tag(name),
        }
    }

    /// `true` when `record` belongs in this list.
    pub fn admits(&self, record: &ImageRecord) -> bool {
        match self {
            Self::All => true,
            Self::Orientation(orientation) => record.orientation == *orientation,
            Self::Tag(name) => record.has_tag(name),
        }
    }

    /// Every list a record should appear in.
    pub fn for_record(record: &ImageRecord) -> Vec<IndexList> {
        let mut lists = vec![Self::All, Self::Orientation(record.orientation)];
        lists.extend(record.tags.iter().cloned().map(Self::Tag));
        lists
    }
}

impl ImageIndex {
    pub fn new(kv: Arc<dyn KvStore>, locks: Arc<KeyLocks>, rename_policy: RenamePolicy) -> Self {
        Self {
            kv,
            locks,
            rename_policy,
        }
    }

    pub fn rename_policy(&self) -> RenamePolicy {
        self.rename_policy
    }

    async fn load_record(&self, id: &str) -> Result<Option<ImageRecord>, AppError> {
        get_json(self.kv.as_ref(), &keys::image(id)).await
    }

    async fn store_record(&self, record: &ImageRecord) -> Result<(), AppError> {
        put_json(self.kv.as_ref(), &keys::image(&record.id), record).await
    }

    /// Read an id list; a missing key is an empty list.
    pub(crate) async fn read_ids(&self, key: &str) -> Result<Vec<String>, AppError> {
        Ok(get_json::<Vec<String>>(self.kv.as_ref(), key)
            .await?
            .unwrap_or_default())
    }

    /// Locked read-modify-write on one id list. `edit` returns whether it
    /// changed anything; unchanged lists are not rewritten.
    async fn modify_ids<F>(&self, key: &str, edit: F) -> Result<bool, AppError>
    where
        F: FnOnce(&mut Vec<String>) -> bool,
    {
        let _guard = self.locks.lock(key).await;
        let mut ids = self.read_ids(key).await?;
        let changed = edit(&mut ids);
        if changed {
            put_json(self.kv.as_ref(), key, &ids).await?;
        }
        Ok(changed)
    }

    /// Put `id` at the front of a list unless it is already present.
    async fn prepend_id(&self, key: &str, id: &str) -> Result<bool, AppError> {
        self.modify_ids(key, |ids| {
            if ids.iter().any(|existing| existing == id) {
                return false;
            }
            ids.insert(0, id.to_string());
            true
        })
        .await
    }

    /// Put `id` at the front of a list, moving it if already present.
    async fn move_id_to_front(&self, key: &str, id: &str) -> Result<bool, AppError> {
        self.modify_ids(key, |ids| {
            if ids.first().map(String::as_str) == Some(id) {
                return false;
            }
            ids.retain(|existing| existing != id);
            ids.insert(0, id.to_string());
            true
        })
        .await
    }

    async fn remove_id(&self, key: &str, id: &str) -> Result<bool, AppError> {
        self.modify_ids(key, |ids| {
            let before = ids.len();
            ids.retain(|existing| existing != id);
            ids.len() != before
        })
        .await
    }
}

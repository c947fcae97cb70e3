//! Consistency sweep over every index list.

use super::{ImageIndex, IndexList};
use crate::db::keys;
use crate::error::AppError;
use crate::models::Orientation;

/// Outcome of [`ImageIndex::repair_indexes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// List entries dropped because their record is gone or no longer
    /// carries the list's attribute.
    pub removed: usize,
    /// List entries added for records that were saved but not fully indexed.
    pub reindexed: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.removed == 0 && self.reindexed == 0
    }
}

impl ImageIndex {
    /// Every list the index maintains: global, both orientations and each
    /// registered tag.
    pub async fn index_lists(&self) -> Result<Vec<IndexList>, AppError> {
        let mut lists = vec![IndexList::All];
        lists.extend(Orientation::ALL.into_iter().map(IndexList::Orientation));
        lists.extend(self.tag_names().await?.into_iter().map(IndexList::Tag));
        Ok(lists)
    }

    /// Drop dangling list entries, then index records that a partial save
    /// left unindexed.
    ///
    /// Each id is checked under its record lock, so concurrent saves and
    /// deletes are never undone.
    pub async fn repair_indexes(&self) -> Result<RepairReport, AppError> {
        let mut report = RepairReport::default();

        for list in self.index_lists().await? {
            let key = list.key();
            for id in self.read_ids(&key).await? {
                let _record_guard = self.locks.lock(&keys::image(&id)).await;
                let keep = match self.load_record(&id).await? {
                    Some(record) => list.admits(&record),
                    None => false,
                };
                if !keep && self.remove_id(&key, &id).await? {
                    tracing::debug!("Removed dangling entry {} from {}", id, key);
                    report.removed += 1;
                }
            }
        }

        for record_key in self.kv.keys_with_prefix(keys::IMAGE_PREFIX).await? {
            let Some(id) = keys::image_id_from_key(&record_key) else {
                continue;
            };
            let _record_guard = self.locks.lock(&record_key).await;
            let Some(record) = self.load_record(id).await? else {
                continue;
            };
            for list in IndexList::for_record(&record) {
                let added = match &list {
                    IndexList::Tag(tag) => {
                        let listed = self.read_ids(&list.key()).await?;
                        if listed.iter().any(|listed_id| listed_id == id) {
                            false
                        } else {
                            self.add_image_to_tag(tag, id).await?;
                            true
                        }
                    }
                    _ => self.prepend_id(&list.key(), id).await?,
                };
                if added {
                    tracing::debug!("Reindexed {} into {}", id, list.key());
                    report.reindexed += 1;
                }
            }
        }

        if !report.is_clean() {
            tracing::info!(
                "Index repair removed {} entries and reindexed {}",
                report.removed,
                report.reindexed
            );
        }
        Ok(report)
    }
}

//! Record lifecycle: save, update and delete.

use super::{ImageIndex, IndexList};
use crate::db::keys;
use crate::error::AppError;
use crate::models::image::dedupe_tags;
use crate::models::{ImagePatch, ImageRecord};
use crate::naming;

/// Sanitize and de-duplicate a tag set, dropping unusable names.
pub(super) fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedupe_tags(
        tags.into_iter()
            .filter_map(|tag| naming::sanitize_tag_name(tag.as_ref())),
    )
}

impl ImageIndex {
    /// Persist a new record and index it everywhere.
    ///
    /// The record is written first, then the global list, the orientation
    /// list and finally each tag. Saving an id that is already indexed does
    /// not duplicate list entries.
    ///
    /// # Returns
    /// The stored record, with tags normalized.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] for a blank id or original path, or a
    /// storage error from any step. Steps already written are kept.
    pub async fn save_image(&self, record: ImageRecord) -> Result<ImageRecord, AppError> {
        if record.id.trim().is_empty() {
            return Err(AppError::Validation("Image id cannot be empty".to_string()));
        }
        if record.paths.original.trim().is_empty() {
            return Err(AppError::Validation(
                "Image original path cannot be empty".to_string(),
            ));
        }

        let mut record = record;
        record.tags = normalize_tags(&record.tags);

        let _record_guard = self.locks.lock(&keys::image(&record.id)).await;
        self.store_record(&record).await?;
        self.prepend_id(&IndexList::All.key(), &record.id).await?;
        self.prepend_id(&IndexList::Orientation(record.orientation).key(), &record.id)
            .await?;
        for tag in &record.tags {
            self.add_image_to_tag(tag, &record.id).await?;
        }

        tracing::debug!(
            "Saved image {} ({}, {} tags)",
            record.id,
            record.orientation,
            record.tags.len()
        );
        Ok(record)
    }

    /// Apply a partial update.
    ///
    /// Only tags in the symmetric difference of the old and new sets touch
    /// tag lists: removals happen before the record write, additions after.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when `id` has no record.
    pub async fn update_image(&self, id: &str, patch: ImagePatch) -> Result<ImageRecord, AppError> {
        let _record_guard = self.locks.lock(&keys::image(id)).await;
        let mut record = self.load_record(id).await?.ok_or(AppError::NotFound)?;

        let mut added = Vec::new();
        if let Some(tags) = patch.tags {
            let next = normalize_tags(&tags);
            let removed: Vec<String> = record
                .tags
                .iter()
                .filter(|tag| !next.contains(tag))
                .cloned()
                .collect();
            added = next
                .iter()
                .filter(|tag| !record.has_tag(tag))
                .cloned()
                .collect();

            for tag in &removed {
                self.remove_id(&keys::tag(tag), id).await?;
            }
            record.tags = next;
        }
        if let Some(expiry_time) = patch.expiry_time {
            record.expiry_time = expiry_time;
        }

        self.store_record(&record).await?;
        for tag in &added {
            self.add_image_to_tag(tag, id).await?;
        }

        Ok(record)
    }

    /// Remove a record and every list entry pointing at it.
    ///
    /// List entries go first, the record last.
    ///
    /// # Returns
    /// The removed record, so the caller can delete its blobs.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when `id` has no record.
    pub async fn delete_image(&self, id: &str) -> Result<ImageRecord, AppError> {
        let record_key = keys::image(id);
        let _record_guard = self.locks.lock(&record_key).await;
        let record = self.load_record(id).await?.ok_or(AppError::NotFound)?;

        let lists = IndexList::for_record(&record);
        for list in lists.iter().rev() {
            self.remove_id(&list.key(), id).await?;
        }
        self.kv.delete(&record_key).await?;

        tracing::debug!("Deleted image {}", id);
        Ok(record)
    }
}

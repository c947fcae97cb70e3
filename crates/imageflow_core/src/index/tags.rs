//! Tag registry lifecycle: create, rename, delete and batch edits.

use super::mutation::normalize_tags;
use super::ImageIndex;
use crate::db::{get_json, keys, put_json};
use crate::error::AppError;
use crate::models::{RenamePolicy, TagSummary};
use crate::naming;

fn require_tag_name(raw: &str) -> Result<String, AppError> {
    naming::sanitize_tag_name(raw)
        .ok_or_else(|| AppError::Validation("Tag name cannot be empty".to_string()))
}

impl ImageIndex {
    /// Registered tag names in registry order.
    pub async fn tag_names(&self) -> Result<Vec<String>, AppError> {
        Ok(get_json::<Vec<String>>(self.kv.as_ref(), keys::TAG_REGISTRY)
            .await?
            .unwrap_or_default())
    }

    /// Every registered tag with its current list length.
    pub async fn list_tags(&self) -> Result<Vec<TagSummary>, AppError> {
        let names = self.tag_names().await?;
        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            let count = self.read_ids(&keys::tag(&name)).await?.len();
            summaries.push(TagSummary { name, count });
        }
        Ok(summaries)
    }

    /// Register a tag. Idempotent.
    ///
    /// # Returns
    /// The sanitized name.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] when nothing usable remains after
    /// sanitizing.
    pub async fn create_tag(&self, name: &str) -> Result<String, AppError> {
        let name = require_tag_name(name)?;
        self.register_tag(&name).await?;
        Ok(name)
    }

    /// Append `name` to the registry and make sure its list key exists.
    /// An existing list is never overwritten.
    async fn register_tag(&self, name: &str) -> Result<bool, AppError> {
        let _registry_guard = self.locks.lock(keys::TAG_REGISTRY).await;
        let mut names = self.tag_names().await?;
        if names.iter().any(|existing| existing == name) {
            return Ok(false);
        }

        let list_key = keys::tag(name);
        {
            let _list_guard = self.locks.lock(&list_key).await;
            if self.kv.get(&list_key).await?.is_none() {
                put_json(self.kv.as_ref(), &list_key, &Vec::<String>::new()).await?;
            }
        }
        names.push(name.to_string());
        put_json(self.kv.as_ref(), keys::TAG_REGISTRY, &names).await?;
        tracing::debug!("Registered tag '{}'", name);
        Ok(true)
    }

    pub(super) async fn add_image_to_tag(&self, tag: &str, id: &str) -> Result<(), AppError> {
        self.register_tag(tag).await?;
        self.prepend_id(&keys::tag(tag), id).await?;
        Ok(())
    }

    /// Rename a tag on every image carrying it.
    ///
    /// Images are moved one at a time: out of the old list, record rewritten,
    /// into the new list. The registry entry is renamed in place up front; a
    /// pre-existing entry for `new` wins and the old entry is dropped.
    ///
    /// Under [`RenamePolicy::Overwrite`] the images previously listed under
    /// `new` (and not under `old`) lose the `new` tag, so records and lists
    /// agree once the rename completes.
    ///
    /// # Returns
    /// The sanitized new name and the number of records rewritten.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when `old` is not registered and
    /// [`AppError::Validation`] when the names are equal or `new` is blank.
    pub async fn rename_tag(
        &self,
        old: &str,
        new: &str,
        policy: RenamePolicy,
    ) -> Result<(String, usize), AppError> {
        let new = require_tag_name(new)?;
        if old == new {
            return Err(AppError::Validation(
                "New tag name must differ from the current one".to_string(),
            ));
        }
        let old_key = keys::tag(old);
        let new_key = keys::tag(&new);

        let displaced = {
            let _registry_guard = self.locks.lock(keys::TAG_REGISTRY).await;
            let mut names = self.tag_names().await?;
            let Some(position) = names.iter().position(|name| name == old) else {
                return Err(AppError::NotFound);
            };
            if names.iter().any(|name| *name == new) {
                names.remove(position);
            } else {
                names[position] = new.clone();
            }

            let _list_guards = self.locks.lock_many(&[&old_key, &new_key]).await;
            let existing = self.kv.get(&new_key).await?.is_some();
            let mut displaced = Vec::new();
            if policy == RenamePolicy::Overwrite && existing {
                let moving = self.read_ids(&old_key).await?;
                displaced = self
                    .read_ids(&new_key)
                    .await?
                    .into_iter()
                    .filter(|id| !moving.contains(id))
                    .collect();
            }
            if policy == RenamePolicy::Overwrite || !existing {
                put_json(self.kv.as_ref(), &new_key, &Vec::<String>::new()).await?;
            }
            put_json(self.kv.as_ref(), keys::TAG_REGISTRY, &names).await?;
            displaced
        };

        for id in &displaced {
            let _record_guard = self.locks.lock(&keys::image(id)).await;
            let Some(mut record) = self.load_record(id).await? else {
                continue;
            };
            if record.has_tag(&new) && !record.has_tag(old) {
                record.tags.retain(|tag| *tag != new);
                self.store_record(&record).await?;
            }
        }

        // Walk the old list back to front so prepending keeps its order.
        let mut affected = 0;
        loop {
            let ids = self.read_ids(&old_key).await?;
            let Some(id) = ids.last().cloned() else {
                break;
            };
            let _record_guard = self.locks.lock(&keys::image(&id)).await;
            self.remove_id(&old_key, &id).await?;
            let Some(mut record) = self.load_record(&id).await? else {
                continue;
            };
            if !record.has_tag(old) {
                continue;
            }
            let renamed: Vec<String> = record
                .tags
                .iter()
                .map(|tag| if tag == old { new.clone() } else { tag.clone() })
                .collect();
            record.set_tags(renamed);
            self.store_record(&record).await?;
            self.move_id_to_front(&new_key, &id).await?;
            affected += 1;
        }
        self.kv.delete(&old_key).await?;

        tracing::info!(
            "Renamed tag '{}' to '{}' ({} images, {} displaced, {} policy)",
            old,
            new,
            affected,
            displaced.len(),
            policy
        );
        Ok((new, affected))
    }

    /// Remove a tag from every image carrying it and unregister it.
    ///
    /// # Returns
    /// The number of records rewritten.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when `name` is not registered.
    pub async fn delete_tag(&self, name: &str) -> Result<usize, AppError> {
        if !self.tag_names().await?.iter().any(|existing| existing == name) {
            return Err(AppError::NotFound);
        }
        let list_key = keys::tag(name);

        let mut affected = 0;
        loop {
            let ids = self.read_ids(&list_key).await?;
            let Some(id) = ids.first().cloned() else {
                break;
            };
            let _record_guard = self.locks.lock(&keys::image(&id)).await;
            self.remove_id(&list_key, &id).await?;
            let Some(mut record) = self.load_record(&id).await? else {
                continue;
            };
            if !record.has_tag(name) {
                continue;
            }
            record.tags.retain(|tag| tag != name);
            self.store_record(&record).await?;
            affected += 1;
        }

        let _registry_guard = self.locks.lock(keys::TAG_REGISTRY).await;
        {
            let _list_guard = self.locks.lock(&list_key).await;
            self.kv.delete(&list_key).await?;
        }
        let mut names = self.tag_names().await?;
        names.retain(|existing| existing != name);
        put_json(self.kv.as_ref(), keys::TAG_REGISTRY, &names).await?;

        tracing::info!("Deleted tag '{}' from {} images", name, affected);
        Ok(affected)
    }

    /// Remove then add tags on each listed image.
    ///
    /// Missing ids are skipped. A storage failure on one image is logged and
    /// does not stop the batch.
    ///
    /// # Returns
    /// The number of records rewritten.
    pub async fn batch_update_tags(
        &self,
        ids: &[String],
        add: &[String],
        remove: &[String],
    ) -> Result<usize, AppError> {
        let add = normalize_tags(add);
        let remove = normalize_tags(remove);
        let mut updated = 0;
        for id in ids {
            match self.batch_update_one(id, &add, &remove).await {
                Ok(true) => updated += 1,
                Ok(false) => tracing::debug!("Batch tag update skipped missing image {}", id),
                Err(err) => tracing::warn!("Batch tag update failed for image {}: {}", id, err),
            }
        }
        Ok(updated)
    }

    async fn batch_update_one(
        &self,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<bool, AppError> {
        let _record_guard = self.locks.lock(&keys::image(id)).await;
        let Some(mut record) = self.load_record(id).await? else {
            return Ok(false);
        };

        for tag in remove.iter().filter(|tag| record.has_tag(tag)) {
            self.remove_id(&keys::tag(tag), id).await?;
        }
        record.tags.retain(|tag| !remove.contains(tag));

        let added: Vec<String> = add
            .iter()
            .filter(|tag| !record.has_tag(tag))
            .cloned()
            .collect();
        record.tags.extend(added.iter().cloned());
        self.store_record(&record).await?;
        for tag in &added {
            self.add_image_to_tag(tag, id).await?;
        }
        Ok(true)
    }
}

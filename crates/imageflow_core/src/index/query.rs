//! Read-side operations: lookup, listing, random selection and expiry scans.

use super::{ImageIndex, IndexList};
use crate::db::keys;
use crate::error::AppError;
use crate::models::{ImagePage, ImageRecord, ListFilters, RandomFilters};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

impl ImageIndex {
    /// Fetch one record.
    pub async fn get_image(&self, id: &str) -> Result<Option<ImageRecord>, AppError> {
        self.load_record(id).await
    }

    /// Hydrate ids in order, skipping ids whose record is gone.
    async fn hydrate(&self, ids: &[String]) -> Result<Vec<ImageRecord>, AppError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load_record(id).await? {
                Some(record) => records.push(record),
                None => tracing::debug!("Skipping dangling index entry {}", id),
            }
        }
        Ok(records)
    }

    /// One page of records, most recent first.
    ///
    /// With a tag filter the tag list order is kept and narrowed by the
    /// orientation list when one is given. `total` counts the full candidate
    /// set before paging.
    pub async fn list_images(&self, filters: &ListFilters) -> Result<ImagePage, AppError> {
        let page = filters.page.max(1);
        let limit = filters.limit.max(1);

        let candidates = match (&filters.tag, filters.orientation) {
            (Some(tag), Some(orientation)) => {
                let allowed: HashSet<String> = self
                    .read_ids(&IndexList::Orientation(orientation).key())
                    .await?
                    .into_iter()
                    .collect();
                let mut ids = self.read_ids(&keys::tag(tag)).await?;
                ids.retain(|id| allowed.contains(id));
                ids
            }
            (Some(tag), None) => self.read_ids(&keys::tag(tag)).await?,
            (None, Some(orientation)) => {
                self.read_ids(&IndexList::Orientation(orientation).key())
                    .await?
            }
            (None, None) => self.read_ids(&IndexList::All.key()).await?,
        };

        let total = candidates.len();
        let offset = (page - 1).saturating_mul(limit);
        let page_ids: Vec<String> = candidates.into_iter().skip(offset).take(limit).collect();
        let images = self.hydrate(&page_ids).await?;
        Ok(ImagePage { images, total })
    }

    /// Ids matching every required tag, none of the excluded tags and the
    /// orientation when given.
    pub async fn random_candidates(&self, filters: &RandomFilters) -> Result<Vec<String>, AppError> {
        let base = match filters.orientation {
            Some(orientation) => IndexList::Orientation(orientation),
            None => IndexList::All,
        };
        let mut ids = self.read_ids(&base.key()).await?;

        for tag in &filters.tags {
            if ids.is_empty() {
                break;
            }
            let required: HashSet<String> =
                self.read_ids(&keys::tag(tag)).await?.into_iter().collect();
            ids.retain(|id| required.contains(id));
        }
        for tag in &filters.exclude {
            if ids.is_empty() {
                break;
            }
            let excluded: HashSet<String> =
                self.read_ids(&keys::tag(tag)).await?.into_iter().collect();
            ids.retain(|id| !excluded.contains(id));
        }
        Ok(ids)
    }

    /// Pick one matching record uniformly at random.
    pub async fn random_image(
        &self,
        filters: &RandomFilters,
    ) -> Result<Option<ImageRecord>, AppError> {
        let mut rng = StdRng::from_entropy();
        self.random_image_with(filters, &mut rng).await
    }

    /// [`ImageIndex::random_image`] with a caller-provided RNG.
    ///
    /// Candidates whose record has vanished are dropped and the draw is
    /// repeated over the rest.
    pub async fn random_image_with<R>(
        &self,
        filters: &RandomFilters,
        rng: &mut R,
    ) -> Result<Option<ImageRecord>, AppError>
    where
        R: Rng + Send,
    {
        let mut candidates = self.random_candidates(filters).await?;
        while let Some(index) = pick_index(&candidates, rng) {
            let id = candidates.swap_remove(index);
            if let Some(record) = self.load_record(&id).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Records whose expiry lies strictly before `now`.
    pub async fn expired_images(&self, now: DateTime<Utc>) -> Result<Vec<ImageRecord>, AppError> {
        let ids = self.read_ids(&IndexList::All.key()).await?;
        let mut expired = Vec::new();
        for record in self.hydrate(&ids).await? {
            if record.is_expired_at(now) {
                expired.push(record);
            }
        }
        Ok(expired)
    }

    /// Number of ids in the global list.
    pub async fn count_images(&self) -> Result<usize, AppError> {
        Ok(self.read_ids(&IndexList::All.key()).await?.len())
    }
}

fn pick_index<R: Rng>(candidates: &[String], rng: &mut R) -> Option<usize> {
    (!candidates.is_empty()).then(|| rng.gen_range(0..candidates.len()))
}

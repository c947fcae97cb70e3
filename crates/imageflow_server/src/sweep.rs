//! Image removal and the scheduled expiry sweep.

use crate::blob::BlobStore;
use crate::{AppError, Database};
use imageflow_core::index::ImageIndex;
use imageflow_core::models::{timestamp, ImageRecord};
use imageflow_core::paths;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Every blob key an image may own: stored paths plus the conventional
/// variant keys.
fn owned_blob_keys(record: &ImageRecord) -> Vec<String> {
    let conventional = paths::generate(&record.id, record.orientation, record.format);
    let mut keys: Vec<String> = Vec::new();
    for key in record
        .paths
        .blob_keys()
        .into_iter()
        .chain(conventional.blob_keys())
    {
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Delete an image's blobs, then its metadata.
///
/// Blobs go first so a failure leaves the record in place for a retry.
///
/// # Errors
/// Returns [`AppError::NotFound`] when no record exists for `id`.
pub async fn purge_image(
    images: &ImageIndex,
    blobs: &dyn BlobStore,
    id: &str,
) -> Result<ImageRecord, AppError> {
    let record = images.get_image(id).await?.ok_or(AppError::NotFound)?;
    for key in owned_blob_keys(&record) {
        blobs.delete(&key).await?;
    }
    images.delete_image(id).await
}

/// Purge every image whose expiry has passed.
///
/// Each image gets `item_timeout`; failures and timeouts are logged and
/// counted without stopping the sweep.
pub async fn run_expiry_sweep(
    db: &Database,
    blobs: &dyn BlobStore,
    item_timeout: Duration,
) -> Result<SweepReport, AppError> {
    let expired = db.images.expired_images(timestamp::now()).await?;
    let mut report = SweepReport::default();
    for record in expired {
        let outcome = tokio::time::timeout(item_timeout, purge_image(&db.images, blobs, &record.id))
            .await
            .unwrap_or(Err(AppError::Timeout));
        match outcome {
            Ok(_) => report.deleted += 1,
            Err(AppError::NotFound) => {
                tracing::debug!("Expired image {} already removed", record.id);
            }
            Err(AppError::Timeout) => {
                tracing::warn!(
                    "Timed out removing expired image {} after {:?}",
                    record.id,
                    item_timeout
                );
                report.failed += 1;
            }
            Err(err) => {
                tracing::warn!("Failed to remove expired image {}: {}", record.id, err);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// One scheduled pass: expiry sweep followed by an index repair.
pub async fn run_maintenance(db: &Database, blobs: &dyn BlobStore, item_timeout: Duration) {
    match run_expiry_sweep(db, blobs, item_timeout).await {
        Ok(report) if report.deleted > 0 || report.failed > 0 => tracing::info!(
            deleted = report.deleted,
            failed = report.failed,
            "Expiry sweep finished"
        ),
        Ok(_) => tracing::debug!("Expiry sweep found nothing to remove"),
        Err(err) => tracing::error!("Expiry sweep failed: {}", err),
    }
    match db.images.repair_indexes().await {
        Ok(report) if !report.is_clean() => tracing::info!(
            removed = report.removed,
            reindexed = report.reindexed,
            "Index repair applied fixes"
        ),
        Ok(_) => {}
        Err(err) => tracing::error!("Index repair failed: {}", err),
    }
}

/// Run [`run_maintenance`] every `interval` until `shutdown` flips to `true`.
pub fn spawn_sweeper(
    db: Arc<Database>,
    blobs: Arc<dyn BlobStore>,
    interval: Duration,
    item_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_maintenance(&db, blobs.as_ref(), item_timeout).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Expiry sweeper stopping");
                        break;
                    }
                }
            }
        }
    })
}

//! Index integration tests.

use super::*;
use crate::db::{MemoryKv, RedbKv};
use crate::error::AppError;
use crate::models::{ImageFormat, ImagePatch, ListFilters, RandomFilters};
use std::collections::HashSet;
use tempfile::TempDir;

fn setup_test_index() -> ImageIndex {
    setup_index_with_policy(RenamePolicy::Overwrite)
}

fn setup_index_with_policy(policy: RenamePolicy) -> ImageIndex {
    ImageIndex::new(
        Arc::new(MemoryKv::new()),
        Arc::new(KeyLocks::new()),
        policy,
    )
}

fn setup_redb_index() -> (ImageIndex, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("db");
    let kv = RedbKv::open(db_path.to_str().unwrap()).unwrap();
    let index = ImageIndex::new(
        Arc::new(kv),
        Arc::new(KeyLocks::new()),
        RenamePolicy::Overwrite,
    );
    (index, temp_dir)
}

fn landscape(tags: &[&str]) -> ImageRecord {
    let mut record = ImageRecord::new("wide.png".to_string(), ImageFormat::Png, 1600, 900);
    record.set_tags(tags.iter().copied());
    record
}

fn portrait(tags: &[&str]) -> ImageRecord {
    let mut record = ImageRecord::new("tall.jpg".to_string(), ImageFormat::Jpeg, 900, 1600);
    record.set_tags(tags.iter().copied());
    record
}

fn tags_filter(tags: &[&str], exclude: &[&str]) -> RandomFilters {
    RandomFilters {
        tags: tags.iter().map(|t| t.to_string()).collect(),
        exclude: exclude.iter().map(|t| t.to_string()).collect(),
        orientation: None,
    }
}

/// Every list entry resolves to a record carrying the list's attribute, and
/// no list holds an id twice.
async fn assert_index_consistent(index: &ImageIndex) {
    for list in index.index_lists().await.unwrap() {
        let key = list.key();
        let ids = index.read_ids(&key).await.unwrap();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate ids in {}", key);
        for id in &ids {
            let record = index
                .get_image(id)
                .await
                .unwrap()
                .unwrap_or_else(|| panic!("{} points at missing record {}", key, id));
            assert!(list.admits(&record), "{} holds {} without match", key, id);
        }
    }
}

mod concurrency;
mod invariants;

//! Randomized operation sequences checked against the consistency invariant.

use super::*;
use crate::models::timestamp;
use chrono::Duration;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const TAG_POOL: [&str; 5] = ["red", "green", "blue", "wide", "old"];

fn random_tags(rng: &mut StdRng) -> Vec<String> {
    let count = rng.gen_range(0..=3);
    TAG_POOL
        .choose_multiple(rng, count)
        .map(|tag| tag.to_string())
        .collect()
}

fn random_record(rng: &mut StdRng) -> ImageRecord {
    let (width, height) = if rng.gen_bool(0.5) {
        (1200, 800)
    } else {
        (800, 1200)
    };
    let mut record = ImageRecord::new("random.png".to_string(), ImageFormat::Png, width, height);
    record.set_tags(random_tags(rng));
    record
}

async fn run_sequence(seed: u64, policy: RenamePolicy) {
    let index = setup_index_with_policy(policy);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut live: Vec<String> = Vec::new();

    for step in 0..150 {
        let op = rng.gen_range(0..8);
        let target = live.choose(&mut rng).cloned();
        match (op, target) {
            (0 | 1, _) | (_, None) => {
                let record = index.save_image(random_record(&mut rng)).await.unwrap();
                live.push(record.id);
            }
            (2, Some(id)) => {
                let expiry = rng
                    .gen_bool(0.5)
                    .then(|| timestamp::now() + Duration::minutes(5));
                index
                    .update_image(
                        &id,
                        ImagePatch {
                            tags: Some(random_tags(&mut rng)),
                            expiry_time: Some(expiry),
                        },
                    )
                    .await
                    .unwrap();
            }
            (3, Some(id)) => {
                index.delete_image(&id).await.unwrap();
                live.retain(|existing| *existing != id);
            }
            (4, Some(id)) => {
                let ids = vec![id, "missing".to_string()];
                index
                    .batch_update_tags(&ids, &random_tags(&mut rng), &random_tags(&mut rng))
                    .await
                    .unwrap();
            }
            (5, _) => {
                let names = index.tag_names().await.unwrap();
                if let Some(old) = names.choose(&mut rng).cloned() {
                    let new = TAG_POOL.choose(&mut rng).unwrap();
                    match index.rename_tag(&old, new, policy).await {
                        Ok(_) => {}
                        Err(AppError::Validation(_)) => assert_eq!(old, *new),
                        Err(other) => panic!("rename failed: {}", other),
                    }
                }
            }
            (6, _) => {
                let names = index.tag_names().await.unwrap();
                if let Some(name) = names.choose(&mut rng).cloned() {
                    index.delete_tag(&name).await.unwrap();
                }
            }
            (_, Some(_)) => {
                index
                    .create_tag(TAG_POOL.choose(&mut rng).unwrap())
                    .await
                    .unwrap();
            }
        }

        assert_index_consistent(&index).await;
        assert_eq!(
            index.count_images().await.unwrap(),
            live.len(),
            "seed {} step {}",
            seed,
            step
        );
    }

    let report = index.repair_indexes().await.unwrap();
    assert_eq!(report.removed, 0, "seed {}", seed);
    assert_index_consistent(&index).await;
}

#[tokio::test]
async fn test_random_sequences_keep_index_consistent() {
    for seed in [1, 7, 42, 1234] {
        run_sequence(seed, RenamePolicy::Overwrite).await;
    }
}

#[tokio::test]
async fn test_random_sequences_keep_index_consistent_with_merge() {
    for seed in [3, 99] {
        run_sequence(seed, RenamePolicy::Merge).await;
    }
}

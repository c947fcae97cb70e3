//! Concurrent writers sharing index lists.

use super::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_sharing_a_tag_keep_every_id() {
    let (index, _temp) = setup_redb_index();
    let index = Arc::new(index);

    let mut handles = Vec::new();
    for i in 0..24 {
        let index = index.clone();
        handles.push(tokio::spawn(async move {
            let record = if i % 2 == 0 {
                landscape(&["shared"])
            } else {
                portrait(&["shared", "odd"])
            };
            index.save_image(record).await.unwrap().id
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    let mut shared = index.read_ids(&keys::tag("shared")).await.unwrap();
    let mut global = index.read_ids(keys::IMAGE_IDS).await.unwrap();
    shared.sort();
    global.sort();
    ids.sort();
    assert_eq!(shared, ids);
    assert_eq!(global, ids);
    assert_eq!(index.read_ids(&keys::tag("odd")).await.unwrap().len(), 12);
    assert_eq!(
        index
            .read_ids(&keys::orientation_ids(Orientation::Landscape))
            .await
            .unwrap()
            .len(),
        12
    );
    assert_eq!(index.tag_names().await.unwrap().len(), 2);
    assert_index_consistent(&index).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batch_updates_on_one_image_all_land() {
    let index = Arc::new(setup_test_index());
    let record = landscape(&[]);
    index.save_image(record.clone()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let index = index.clone();
        let id = record.id.clone();
        handles.push(tokio::spawn(async move {
            index
                .batch_update_tags(&[id], &[format!("tag-{}", i)], &[])
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }

    let stored = index.get_image(&record.id).await.unwrap().unwrap();
    assert_eq!(stored.tags.len(), 10);
    for i in 0..10 {
        let tag = format!("tag-{}", i);
        assert!(stored.has_tag(&tag));
        assert_eq!(
            index.read_ids(&keys::tag(&tag)).await.unwrap(),
            vec![record.id.clone()]
        );
    }
    assert_index_consistent(&index).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delete_racing_tag_update_leaves_no_dangling_entries() {
    let index = Arc::new(setup_test_index());
    let mut records = Vec::new();
    for _ in 0..8 {
        let record = landscape(&["race"]);
        index.save_image(record.clone()).await.unwrap();
        records.push(record);
    }

    let mut handles = Vec::new();
    for record in &records {
        let deleter = index.clone();
        let id = record.id.clone();
        handles.push(tokio::spawn(async move {
            deleter.delete_image(&id).await.map(|_| ())
        }));
        let tagger = index.clone();
        let id = record.id.clone();
        handles.push(tokio::spawn(async move {
            tagger
                .batch_update_tags(&[id], &["late".to_string()], &[])
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(index.count_images().await.unwrap(), 0);
    assert!(index.read_ids(&keys::tag("late")).await.unwrap().is_empty());
    assert_index_consistent(&index).await;
}

//! Model-level unit tests.

use super::image::{TagsInput, UpdateImageRequest};
use super::*;
use chrono::{Duration, TimeZone, Utc};

#[test]
fn test_image_record_new_derives_orientation_and_original_key() {
    let landscape = ImageRecord::new("wide.png".to_string(), ImageFormat::Png, 1920, 1080);
    assert_eq!(landscape.orientation, Orientation::Landscape);
    assert_eq!(
        landscape.paths.original,
        format!("original/landscape/{}.png", landscape.id)
    );
    assert!(landscape.paths.webp.is_empty());
    assert!(landscape.paths.avif.is_empty());

    let square = ImageRecord::new("square.jpg".to_string(), ImageFormat::Jpeg, 500, 500);
    assert_eq!(square.orientation, Orientation::Landscape);

    let tall = ImageRecord::new("tall.gif".to_string(), ImageFormat::Gif, 300, 900);
    assert_eq!(tall.orientation, Orientation::Portrait);
    assert_eq!(tall.paths.original, format!("original/portrait/{}.gif", tall.id));
}

#[test]
fn test_record_json_uses_camel_case_and_canonical_timestamps() {
    let mut record = ImageRecord::new("cat.webp".to_string(), ImageFormat::Webp, 10, 20);
    record.upload_time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
    record.expiry_time = Some(record.upload_time + Duration::minutes(90));

    let value = serde_json::to_value(&record).expect("serialize");
    assert_eq!(value["originalName"], "cat.webp");
    assert_eq!(value["uploadTime"], "2024-03-01T12:30:05.000Z");
    assert_eq!(value["expiryTime"], "2024-03-01T14:00:05.000Z");
    assert_eq!(value["orientation"], "portrait");
    assert_eq!(value["format"], "webp");

    let back: ImageRecord = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, record);
}

#[test]
fn test_record_without_expiry_omits_field_and_reads_legacy_rows() {
    let record = ImageRecord::new("a.png".to_string(), ImageFormat::Png, 4, 3);
    let value = serde_json::to_value(&record).expect("serialize");
    assert!(value.get("expiryTime").is_none());

    let legacy = serde_json::json!({
        "id": "0b6c3c1e-54f4-4a8b-9d3c-0c9f1d1b2a3e",
        "originalName": "legacy.jpg",
        "uploadTime": "2023-12-31T23:59:59.123456Z",
        "orientation": "landscape",
        "tags": ["old"],
        "format": "jpg",
        "width": 800,
        "height": 600,
        "paths": { "original": "original/landscape/x.jpg", "webp": "", "avif": "" },
        "sizes": { "original": 12, "webp": 0, "avif": 0 }
    });
    let parsed: ImageRecord = serde_json::from_value(legacy).expect("legacy row");
    assert_eq!(parsed.format, ImageFormat::Jpeg);
    assert!(parsed.expiry_time.is_none());
    assert_eq!(parsed.paths.blob_keys(), vec!["original/landscape/x.jpg"]);
}

#[test]
fn test_canonical_timestamps_sort_chronologically() {
    let early = Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap();
    let late = early + Duration::milliseconds(1500);
    let a = timestamp::format(&early);
    let b = timestamp::format(&late);
    assert!(a < b);
    assert_eq!(a.len(), b.len());
}

#[test]
fn test_is_expired_at_is_strict() {
    let mut record = ImageRecord::new("a.png".to_string(), ImageFormat::Png, 1, 1);
    let now = timestamp::now();
    assert!(!record.is_expired_at(now));

    record.expiry_time = Some(now);
    assert!(!record.is_expired_at(now));

    record.expiry_time = Some(now - Duration::hours(1));
    assert!(record.is_expired_at(now));
}

#[test]
fn test_set_tags_dedupes_in_first_seen_order() {
    let mut record = ImageRecord::new("a.png".to_string(), ImageFormat::Png, 1, 1);
    record.set_tags(["b", "a", "b", "c", "a"]);
    assert_eq!(record.tags, vec!["b", "a", "c"]);
    assert!(record.has_tag("c"));
    assert!(!record.has_tag("d"));
}

#[test]
fn test_update_request_accepts_tag_array_or_csv() {
    let from_list: UpdateImageRequest =
        serde_json::from_str(r#"{"tags": ["Nature", " sky ", "nature"], "expiryMinutes": 5}"#)
            .expect("list form");
    assert_eq!(from_list.expiry_minutes, Some(5));
    assert_eq!(
        from_list.tags.expect("tags").into_tags(),
        vec!["nature".to_string(), "sky".to_string()]
    );

    let from_csv: UpdateImageRequest =
        serde_json::from_str(r#"{"tags": "one, two,,one"}"#).expect("csv form");
    assert!(matches!(from_csv.tags, Some(TagsInput::Csv(_))));
    assert_eq!(
        from_csv.tags.expect("tags").into_tags(),
        vec!["one".to_string(), "two".to_string()]
    );
}

#[test]
fn test_enum_parsing() {
    assert_eq!("Portrait".parse::<Orientation>(), Ok(Orientation::Portrait));
    assert!("square".parse::<Orientation>().is_err());
    assert_eq!("JPG".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
    assert!("bmp".parse::<ImageFormat>().is_err());
    assert_eq!("merge".parse::<RenamePolicy>(), Ok(RenamePolicy::Merge));
    assert!(!ImageFormat::Gif.has_variants());
}

#[test]
fn test_total_pages_rounds_up() {
    let page = ImagePage {
        images: Vec::new(),
        total: 25,
    };
    assert_eq!(page.total_pages(12), 3);
    assert_eq!(page.total_pages(25), 1);
    let empty = ImagePage {
        images: Vec::new(),
        total: 0,
    };
    assert_eq!(empty.total_pages(12), 0);
}

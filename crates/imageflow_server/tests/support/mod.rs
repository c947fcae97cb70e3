//! Shared integration-test server bootstrap helpers.

#![allow(dead_code)]

use axum::http::{header, HeaderName, HeaderValue};
use axum_test::TestServer;
use imageflow_server::{create_app, AppState, Config, Database, FilesystemBlobStore};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) const TEST_API_KEY: &str = "test-key";
pub(crate) const TEST_BASE_URL: &str = "http://images.test";

pub(crate) fn test_config_for_dir(root: &Path) -> Config {
    Config {
        port: 0,
        db_path: root.join("db").to_string_lossy().to_string(),
        blob_dir: root.join("blobs").to_string_lossy().to_string(),
        public_base_url: Some(TEST_BASE_URL.to_string()),
        api_keys: vec![TEST_API_KEY.to_string()],
        cleanup_interval_secs: 0,
        ..Config::default()
    }
}

pub(crate) async fn test_server_for_config(config: Config) -> (TestServer, AppState) {
    let db = Database::new(&config).expect("open db");
    let blobs = FilesystemBlobStore::new(&config.blob_dir)
        .await
        .expect("blob dir");
    let state = AppState::new(config, db, Arc::new(blobs));
    let app = create_app(state.clone(), false);
    let server = TestServer::new(app).expect("server");
    (server, state)
}

pub(crate) async fn setup_test_server() -> (TestServer, TempDir, AppState) {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config_for_dir(temp_dir.path());
    let (server, state) = test_server_for_config(config).await;
    (server, temp_dir, state)
}

pub(crate) fn auth_header() -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_static("Bearer test-key"),
    )
}

/// Encode a solid-color image of the given size.
pub(crate) fn encoded_image(format: image::ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode image");
    out.into_inner()
}

pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
    encoded_image(image::ImageFormat::Png, width, height)
}

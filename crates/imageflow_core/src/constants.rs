//! Shared constants used across ImageFlow crates.

/// Default API port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default maximum accepted upload size per file.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum number of files accepted by one upload request.
pub const DEFAULT_MAX_UPLOAD_COUNT: usize = 20;

/// Default quality hint handed to the CDN image proxy.
pub const DEFAULT_IMAGE_QUALITY: u8 = 80;

/// Default page number for image listings.
pub const DEFAULT_PAGE: usize = 1;
/// Default page size for image listings.
pub const DEFAULT_PAGE_LIMIT: usize = 12;
/// Upper bound for the page size accepted by the API.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Default interval between scheduled expiry sweeps, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3_600;

/// Default per-image timeout applied during an expiry sweep, in seconds.
pub const DEFAULT_CLEANUP_ITEM_TIMEOUT_SECS: u64 = 30;

/// Formats accepted by the upload flow.
pub const SUPPORTED_FORMATS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp", "avif"];

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "metadata.redb";

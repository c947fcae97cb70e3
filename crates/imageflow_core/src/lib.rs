//! Core domain library for ImageFlow (config, KV storage, metadata index).

/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Key-value storage layer.
pub mod db;
/// Application error types (storage/domain).
pub mod error;
/// Metadata index over the KV store.
pub mod index;
/// Per-key async locks.
pub mod locks;
/// Data models for API requests and persistence.
pub mod models;
/// Tag-name and image id helpers.
pub mod naming;
/// Blob key layout.
pub mod paths;

pub use config::Config;
pub use constants::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT, DEFAULT_PORT, MAX_PAGE_LIMIT};
pub use db::{Database, KvStore};
pub use error::AppError;
pub use index::{ImageIndex, IndexList, RepairReport};

//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_CLEANUP_ITEM_TIMEOUT_SECS, DEFAULT_IMAGE_QUALITY,
    DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_UPLOAD_COUNT, DEFAULT_PORT,
};
use crate::models::tag::RenamePolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for ImageFlow.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub blob_dir: String,
    pub port: u16,
    /// Absolute origin used when building public image URLs. `None` means
    /// the request's own origin is used.
    pub public_base_url: Option<String>,
    pub max_file_size: usize,
    pub max_upload_count: usize,
    pub image_quality: u8,
    pub cleanup_interval_secs: u64,
    pub cleanup_item_timeout_secs: u64,
    pub cdn_image_proxy: bool,
    pub rename_policy: RenamePolicy,
    /// Keys accepted in addition to the ones registered in the KV store.
    pub api_keys: Vec<String>,
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

fn data_dir() -> PathBuf {
    let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".local").join("share").join("imageflow")
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

/// Split a comma-separated key list, dropping blanks.
pub fn parse_key_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let rename_policy = match env::var("TAG_RENAME_POLICY") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid TAG_RENAME_POLICY='{}'; falling back to overwrite",
                    value
                );
                RenamePolicy::Overwrite
            }),
            Err(_) => RenamePolicy::Overwrite,
        };

        Self {
            db_path: env::var("DB_PATH").map(expand_tilde).unwrap_or_else(|_| {
                data_dir().join("db").to_string_lossy().to_string()
            }),
            blob_dir: env::var("BLOB_DIR").map(expand_tilde).unwrap_or_else(|_| {
                data_dir().join("blobs").to_string_lossy().to_string()
            }),
            port: env_parsed("PORT").unwrap_or(DEFAULT_PORT),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            max_file_size: env_parsed("MAX_FILE_SIZE").unwrap_or(DEFAULT_MAX_FILE_SIZE),
            max_upload_count: env_parsed("MAX_UPLOAD_COUNT").unwrap_or(DEFAULT_MAX_UPLOAD_COUNT),
            image_quality: env_parsed::<u8>("IMAGE_QUALITY")
                .map(|q| q.clamp(1, 100))
                .unwrap_or(DEFAULT_IMAGE_QUALITY),
            cleanup_interval_secs: env_parsed("CLEANUP_INTERVAL_SECS")
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS),
            cleanup_item_timeout_secs: env_parsed("CLEANUP_ITEM_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_CLEANUP_ITEM_TIMEOUT_SECS),
            cdn_image_proxy: env_flag_enabled("CDN_IMAGE_PROXY"),
            rename_policy,
            api_keys: env::var("API_KEYS")
                .map(|keys| parse_key_list(&keys))
                .unwrap_or_default(),
        }
    }

    /// Interval between scheduled expiry sweeps. Zero disables the schedule.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }

    /// Per-image deadline used by the expiry sweep.
    pub fn cleanup_item_timeout(&self) -> Duration {
        Duration::from_secs(self.cleanup_item_timeout_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("db").to_string_lossy().to_string(),
            blob_dir: data_dir().join("blobs").to_string_lossy().to_string(),
            port: DEFAULT_PORT,
            public_base_url: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_upload_count: DEFAULT_MAX_UPLOAD_COUNT,
            image_quality: DEFAULT_IMAGE_QUALITY,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            cleanup_item_timeout_secs: DEFAULT_CLEANUP_ITEM_TIMEOUT_SECS,
            cdn_image_proxy: false,
            rename_policy: RenamePolicy::Overwrite,
            api_keys: Vec::new(),
        }
    }
}

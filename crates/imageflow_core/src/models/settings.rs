//! Public upload settings exposed by `GET /api/config`.

use crate::constants::SUPPORTED_FORMATS;
use crate::Config;
use serde::{Deserialize, Serialize};

/// Limits the UI enforces before uploading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSettings {
    pub max_upload_count: usize,
    pub max_file_size: usize,
    pub supported_formats: Vec<String>,
    pub image_quality: u8,
}

impl UploadSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_count: config.max_upload_count,
            max_file_size: config.max_file_size,
            supported_formats: SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect(),
            image_quality: config.image_quality,
        }
    }
}

//! Tag registry models and request payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registered tag with the number of images currently indexed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub name: String,
    pub count: usize,
}

/// What `rename_tag` does when the destination tag already has images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenamePolicy {
    /// Destination list is replaced by the source list. Images that carried
    /// only the destination tag drop out of its index.
    #[default]
    Overwrite,
    /// Destination list keeps its images after the renamed ones.
    Merge,
}

impl fmt::Display for RenamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => f.write_str("overwrite"),
            Self::Merge => f.write_str("merge"),
        }
    }
}

impl FromStr for RenamePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "merge" => Ok(Self::Merge),
            other => Err(format!("unknown rename policy '{}'", other)),
        }
    }
}

/// Request payload for `POST /api/tags`.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
}

/// Request payload for `PUT /api/tags/:name`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameTagRequest {
    #[serde(default)]
    pub new_name: String,
}

/// Request payload for `POST /api/tags/batch`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTagsRequest {
    #[serde(default)]
    pub image_ids: Vec<String>,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
}

//! Image record models and request/filter payloads.

use super::timestamp;
use crate::naming;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Landscape/portrait classification fixed at upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Orientation::Landscape, Orientation::Portrait];

    /// Square images count as landscape.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width >= height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Ok(Self::Landscape),
            "portrait" => Ok(Self::Portrait),
            other => Err(format!("invalid orientation '{}'", other)),
        }
    }
}

/// Encoded format of the original upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// Animated formats are never served through derived variants.
    pub fn has_variants(self) -> bool {
        self != Self::Gif
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "webp" => Ok(Self::Webp),
            "avif" => Ok(Self::Avif),
            other => Err(format!("unsupported format '{}'", other)),
        }
    }
}

/// Relative blob keys for each stored variant. Empty means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPaths {
    pub original: String,
    #[serde(default)]
    pub webp: String,
    #[serde(default)]
    pub avif: String,
}

impl VariantPaths {
    /// Every non-empty blob key, original first.
    pub fn blob_keys(&self) -> Vec<&str> {
        [&self.original, &self.webp, &self.avif]
            .into_iter()
            .filter(|key| !key.is_empty())
            .map(String::as_str)
            .collect()
    }
}

/// Byte sizes per stored variant; 0 for absent variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSizes {
    pub original: u64,
    #[serde(default)]
    pub webp: u64,
    #[serde(default)]
    pub avif: u64,
}

/// One uploaded image, stored under `image:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub original_name: String,
    #[serde(with = "timestamp")]
    pub upload_time: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub expiry_time: Option<DateTime<Utc>>,
    pub orientation: Orientation,
    #[serde(default)]
    pub tags: Vec<String>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub paths: VariantPaths,
    #[serde(default)]
    pub sizes: VariantSizes,
}

impl ImageRecord {
    /// Build a fresh record for an upload with a generated id.
    ///
    /// Orientation and the original blob key are derived here and never
    /// change afterwards.
    pub fn new(original_name: String, format: ImageFormat, width: u32, height: u32) -> Self {
        let id = naming::new_image_id();
        let orientation = Orientation::from_dimensions(width, height);
        Self {
            paths: VariantPaths {
                original: paths::original_key(&id, orientation, format),
                webp: String::new(),
                avif: String::new(),
            },
            id,
            original_name,
            upload_time: timestamp::now(),
            expiry_time: None,
            orientation,
            tags: Vec::new(),
            format,
            width,
            height,
            sizes: VariantSizes::default(),
        }
    }

    /// Replace the tag set, dropping duplicates while keeping first-seen order.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = dedupe_tags(tags);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// `true` when an expiry is set and lies strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time.map(|expiry| expiry < now).unwrap_or(false)
    }
}

/// De-duplicate tag names keeping first-seen order.
pub fn dedupe_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.into();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Partial update applied by `update_image`.
///
/// `expiry_time: Some(None)` clears the expiry; `None` leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct ImagePatch {
    pub tags: Option<Vec<String>>,
    pub expiry_time: Option<Option<DateTime<Utc>>>,
}

/// Request payload for `PUT /api/images/:id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageRequest {
    /// Either a JSON array or a comma-separated string.
    pub tags: Option<TagsInput>,
    pub expiry_minutes: Option<i64>,
}

/// Tag list accepted either as an array or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    /// Sanitized, de-duplicated tag names.
    pub fn into_tags(self) -> Vec<String> {
        match self {
            Self::List(items) => dedupe_tags(items.iter().filter_map(|t| naming::sanitize_tag_name(t))),
            Self::Csv(raw) => naming::parse_tags(Some(raw.as_str())),
        }
    }
}

/// Filters for paginated listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilters {
    pub page: usize,
    pub limit: usize,
    pub tag: Option<String>,
    pub orientation: Option<Orientation>,
}

impl Default for ListFilters {
    fn default() -> Self {
        Self {
            page: crate::constants::DEFAULT_PAGE,
            limit: crate::constants::DEFAULT_PAGE_LIMIT,
            tag: None,
            orientation: None,
        }
    }
}

/// Query parameters for `GET /api/images`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub tag: Option<String>,
    pub orientation: Option<String>,
}

/// One page of hydrated records plus the size of the full candidate set.
#[derive(Debug, Clone)]
pub struct ImagePage {
    pub images: Vec<ImageRecord>,
    pub total: usize,
}

impl ImagePage {
    pub fn total_pages(&self, limit: usize) -> usize {
        self.total.div_ceil(limit.max(1))
    }
}

/// Filters for random selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RandomFilters {
    /// Every listed tag is required.
    pub tags: Vec<String>,
    /// Any listed tag disqualifies an image.
    pub exclude: Vec<String>,
    pub orientation: Option<Orientation>,
}

/// Query parameters for `GET /api/random`.
#[derive(Debug, Default, Deserialize)]
pub struct RandomQuery {
    pub tags: Option<String>,
    pub exclude: Option<String>,
    pub orientation: Option<String>,
    pub format: Option<String>,
}

//! KV key names.
//!
//! These match the layout of existing deployments and must not change.

use crate::models::Orientation;

/// Prefix of every image record key.
pub const IMAGE_PREFIX: &str = "image:";
/// Global list of image ids, most recent first.
pub const IMAGE_IDS: &str = "image_ids";
/// Registry of tag names.
pub const TAG_REGISTRY: &str = "tags";
/// Registered API keys.
pub const API_KEYS: &str = "api_keys";
/// Optional upload-settings override.
pub const SETTINGS: &str = "config";

pub fn image(id: &str) -> String {
    format!("{}{}", IMAGE_PREFIX, id)
}

pub fn orientation_ids(orientation: Orientation) -> String {
    format!("{}:{}", IMAGE_IDS, orientation)
}

pub fn tag(name: &str) -> String {
    format!("tag:{}", name)
}

/// Recover the image id from a record key.
pub fn image_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(IMAGE_PREFIX).filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_matches_existing_deployments() {
        assert_eq!(image("abc"), "image:abc");
        assert_eq!(orientation_ids(Orientation::Landscape), "image_ids:landscape");
        assert_eq!(orientation_ids(Orientation::Portrait), "image_ids:portrait");
        assert_eq!(tag("sky"), "tag:sky");
        assert_eq!(image_id_from_key("image:abc"), Some("abc"));
        assert_eq!(image_id_from_key("image:"), None);
        assert_eq!(image_id_from_key("image_ids"), None);
    }
}

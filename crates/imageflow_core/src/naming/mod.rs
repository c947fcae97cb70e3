//! Tag-name sanitizing and image id helpers.

use uuid::Uuid;

/// Longest tag name kept after sanitizing, in characters.
pub const MAX_TAG_NAME_CHARS: usize = 50;

/// Normalize a user-supplied tag name.
///
/// Trims, lowercases, turns inner whitespace runs into a single `-` and drops
/// anything that is not alphanumeric, `-` or `_`.
///
/// # Returns
/// The sanitized name, or `None` when nothing usable remains.
pub fn sanitize_tag_name(raw: &str) -> Option<String> {
    let mut out = String::new();
    let mut pending_dash = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_dash = !out.is_empty();
            continue;
        }
        if !(ch.is_alphanumeric() || ch == '-' || ch == '_') {
            continue;
        }
        if pending_dash {
            out.push('-');
            pending_dash = false;
        }
        out.extend(ch.to_lowercase());
    }
    let out: String = out.chars().take(MAX_TAG_NAME_CHARS).collect();
    let out = out.trim_matches('-').to_string();
    (!out.is_empty()).then_some(out)
}

/// Parse a comma-separated tag list from a query or form field.
///
/// # Returns
/// Sanitized, de-duplicated names in first-seen order.
pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let mut tags: Vec<String> = Vec::new();
    for name in raw.split(',').filter_map(sanitize_tag_name) {
        if !tags.contains(&name) {
            tags.push(name);
        }
    }
    tags
}

/// Generate a new image id (UUID v4, hyphenated lowercase).
pub fn new_image_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns `true` when `id` is a well-formed UUID.
pub fn is_valid_image_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

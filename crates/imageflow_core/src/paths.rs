//! Blob key layout.
//!
//! Existing buckets are laid out as
//! `original/<orientation>/<id>.<ext>`, `<orientation>/webp/<id>.webp` and
//! `<orientation>/avif/<id>.avif`; keys generated here must match exactly.

use crate::models::{ImageFormat, Orientation, VariantPaths};

/// Key of the original upload.
pub fn original_key(id: &str, orientation: Orientation, format: ImageFormat) -> String {
    format!("original/{}/{}.{}", orientation, id, format.as_str())
}

/// Key of the WebP variant.
pub fn webp_key(id: &str, orientation: Orientation) -> String {
    format!("{}/webp/{}.webp", orientation, id)
}

/// Key of the AVIF variant.
pub fn avif_key(id: &str, orientation: Orientation) -> String {
    format!("{}/avif/{}.avif", orientation, id)
}

/// Full key set for an image, including variants that may not be stored.
pub fn generate(id: &str, orientation: Orientation, format: ImageFormat) -> VariantPaths {
    VariantPaths {
        original: original_key(id, orientation, format),
        webp: webp_key(id, orientation),
        avif: avif_key(id, orientation),
    }
}

//! Data models for persistence and API payloads.

/// Image records, filters and request payloads.
pub mod image;
/// Upload settings shared with clients.
pub mod settings;
/// Tag registry models.
pub mod tag;
/// Canonical timestamp encoding.
pub mod timestamp;

#[cfg(test)]
mod tests;

pub use image::{
    ImageFormat, ImagePage, ImagePatch, ImageRecord, ListFilters, Orientation, RandomFilters,
    VariantPaths, VariantSizes,
};
pub use tag::{RenamePolicy, TagSummary};

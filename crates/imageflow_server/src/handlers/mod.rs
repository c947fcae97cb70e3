//! HTTP request handlers.

/// Public blob passthrough.
pub mod blobs;
/// Image listing, detail, update and delete endpoints.
pub mod images;
pub(crate) mod normalize;
/// Public random-image endpoint.
pub mod random;
pub mod system;
/// Tag registry endpoints.
pub mod tags;
/// Multipart upload endpoint.
pub mod upload;

//! Public random-image endpoint.

use super::normalize::normalize_optional;
use crate::blob::BlobStore;
use crate::error::HttpError;
use crate::{naming, AppState};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use imageflow_core::models::image::RandomQuery;
use imageflow_core::models::{ImageFormat, ImageRecord, Orientation, RandomFilters};

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

const MOBILE_MARKERS: &[&str] = &[
    "mobile",
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "windows phone",
    "opera mini",
    "iemobile",
];

/// Encoding served for a random pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeFormat {
    Original,
    Webp,
    Avif,
}

impl ServeFormat {
    fn from_param(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "original" => Some(Self::Original),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }

    /// Best format the client advertises in `Accept`: AVIF, then WebP.
    pub fn negotiate(accept: Option<&str>) -> Self {
        let accept = accept.unwrap_or_default().to_ascii_lowercase();
        if accept.contains("image/avif") {
            Self::Avif
        } else if accept.contains("image/webp") {
            Self::Webp
        } else {
            Self::Original
        }
    }
}

pub fn is_mobile_user_agent(user_agent: Option<&str>) -> bool {
    let Some(user_agent) = user_agent else {
        return false;
    };
    let user_agent = user_agent.to_ascii_lowercase();
    MOBILE_MARKERS
        .iter()
        .any(|marker| user_agent.contains(marker))
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// `auto` picks portrait for mobile clients, landscape otherwise.
fn requested_orientation(value: Option<&str>, headers: &HeaderMap) -> Option<Orientation> {
    match normalize_optional(value)?.to_ascii_lowercase().as_str() {
        "auto" => Some(
            if is_mobile_user_agent(header_str(headers, header::USER_AGENT)) {
                Orientation::Portrait
            } else {
                Orientation::Landscape
            },
        ),
        other => other.parse().ok(),
    }
}

/// Blob key and content type to serve. Missing variants fall back to the
/// original; GIFs are always served as-is.
fn select_variant(record: &ImageRecord, format: ServeFormat) -> (&str, &'static str) {
    let original = (record.paths.original.as_str(), record.format.content_type());
    if record.format == ImageFormat::Gif {
        return original;
    }
    match format {
        ServeFormat::Avif if !record.paths.avif.is_empty() => {
            (record.paths.avif.as_str(), ImageFormat::Avif.content_type())
        }
        ServeFormat::Webp if !record.paths.webp.is_empty() => {
            (record.paths.webp.as_str(), ImageFormat::Webp.content_type())
        }
        _ => original,
    }
}

/// `GET /api/random`
pub async fn random_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RandomQuery>,
) -> Result<Response, HttpError> {
    let filters = RandomFilters {
        tags: naming::parse_tags(query.tags.as_deref()),
        exclude: naming::parse_tags(query.exclude.as_deref()),
        orientation: requested_orientation(query.orientation.as_deref(), &headers),
    };
    let record = state
        .db
        .images
        .random_image(&filters)
        .await?
        .ok_or_else(|| HttpError::not_found("No images found matching criteria"))?;

    let format = normalize_optional(query.format.as_deref())
        .and_then(ServeFormat::from_param)
        .unwrap_or_else(|| ServeFormat::negotiate(header_str(&headers, header::ACCEPT)));
    let (mut key, mut content_type) = select_variant(&record, format);

    let mut blob = state.blobs.get(key).await?;
    if blob.is_none() && key != record.paths.original {
        tracing::warn!("Variant {} missing for image {}; serving original", key, record.id);
        key = &record.paths.original;
        content_type = record.format.content_type();
        blob = state.blobs.get(key).await?;
    }
    let Some(blob) = blob else {
        tracing::warn!("Blob {} missing for image {}", key, record.id);
        return Err(HttpError::not_found("Image file not found"));
    };

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE)),
        ],
        blob.data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiation_prefers_avif_then_webp() {
        assert_eq!(
            ServeFormat::negotiate(Some("image/avif,image/webp,*/*")),
            ServeFormat::Avif
        );
        assert_eq!(
            ServeFormat::negotiate(Some("image/webp,image/apng,*/*;q=0.8")),
            ServeFormat::Webp
        );
        assert_eq!(ServeFormat::negotiate(Some("*/*")), ServeFormat::Original);
        assert_eq!(ServeFormat::negotiate(None), ServeFormat::Original);
    }

    #[test]
    fn mobile_user_agents_are_detected() {
        assert!(is_mobile_user_agent(Some(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148"
        )));
        assert!(is_mobile_user_agent(Some("Mozilla/5.0 (Linux; Android 14)")));
        assert!(!is_mobile_user_agent(Some(
            "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0"
        )));
        assert!(!is_mobile_user_agent(None));
    }

    #[test]
    fn auto_orientation_uses_user_agent() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            requested_orientation(Some("auto"), &headers),
            Some(Orientation::Landscape)
        );
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (Linux; Android 14) Mobile"),
        );
        assert_eq!(
            requested_orientation(Some("auto"), &headers),
            Some(Orientation::Portrait)
        );
        assert_eq!(
            requested_orientation(Some("landscape"), &headers),
            Some(Orientation::Landscape)
        );
        assert_eq!(requested_orientation(Some("sideways"), &headers), None);
        assert_eq!(requested_orientation(None, &headers), None);
    }

    #[test]
    fn variant_selection_falls_back_to_original() {
        let mut record = ImageRecord::new("a.jpeg".to_string(), ImageFormat::Jpeg, 800, 600);
        let original = record.paths.original.clone();
        assert_eq!(
            select_variant(&record, ServeFormat::Avif),
            (original.as_str(), "image/jpeg")
        );

        record.paths.webp = "landscape/webp/a.webp".to_string();
        assert_eq!(
            select_variant(&record, ServeFormat::Webp),
            ("landscape/webp/a.webp", "image/webp")
        );
        assert_eq!(
            select_variant(&record, ServeFormat::Original),
            (original.as_str(), "image/jpeg")
        );

        let mut gif = ImageRecord::new("a.gif".to_string(), ImageFormat::Gif, 10, 10);
        gif.paths.webp = "landscape/webp/g.webp".to_string();
        assert_eq!(
            select_variant(&gif, ServeFormat::Webp),
            (gif.paths.original.as_str(), "image/gif")
        );
    }
}

//! Public URL construction for stored images.

use axum::http::{header, HeaderMap, Uri};
use imageflow_core::models::ImageRecord;
use imageflow_core::Config;
use serde::Serialize;

/// Route prefix under which blobs are served.
pub const BLOB_ROUTE_PREFIX: &str = "/r2";

const CDN_PREFIX: &str = "/cdn-cgi/image/";
const CDN_MAX_DIMENSION: u32 = 4096;
const CDN_DEFAULT_QUALITY: u8 = 75;

/// Output format requested from the CDN image proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdnFormat {
    Webp,
    Avif,
}

impl CdnFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }
}

/// On-the-fly transform options for the CDN image proxy. Images are always
/// requested with `fit=scale-down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdnImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
    pub format: CdnFormat,
}

impl CdnImageOptions {
    pub fn new(format: CdnFormat) -> Self {
        Self {
            width: None,
            height: None,
            quality: None,
            format,
        }
    }

    fn options_segment(&self) -> String {
        let mut parts = Vec::new();
        if let Some(width) = self.width.filter(|w| *w > 0) {
            parts.push(format!("width={}", width.min(CDN_MAX_DIMENSION)));
        }
        if let Some(height) = self.height.filter(|h| *h > 0) {
            parts.push(format!("height={}", height.min(CDN_MAX_DIMENSION)));
        }
        parts.push("fit=scale-down".to_string());
        let quality = self.quality.unwrap_or(CDN_DEFAULT_QUALITY).clamp(1, 100);
        parts.push(format!("quality={}", quality));
        parts.push(format!("format={}", self.format.as_str()));
        parts.join(",")
    }
}

/// Rewrite an absolute URL to go through the `/cdn-cgi/image/` proxy.
///
/// URLs already routed through the proxy get their options replaced.
/// Inputs that are not absolute URLs are returned unchanged.
pub fn cdn_image_url(url: &str, options: &CdnImageOptions) -> String {
    let Ok(uri) = url.parse::<Uri>() else {
        return url.to_string();
    };
    let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
        return url.to_string();
    };
    let options = options.options_segment();
    let path = uri.path();
    let new_path = match path.strip_prefix(CDN_PREFIX) {
        Some(rest) => match rest.find('/') {
            Some(slash) => format!("{}{}{}", CDN_PREFIX, options, &rest[slash..]),
            None => return url.to_string(),
        },
        None => format!("{}{}{}", CDN_PREFIX, options, path),
    };
    let query = uri.query().map(|q| format!("?{}", q)).unwrap_or_default();
    format!("{}://{}{}{}", scheme, authority, new_path, query)
}

/// Public URLs attached to image responses. Absent variants are `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageUrls {
    pub original: String,
    pub webp: String,
    pub avif: String,
}

/// Builds blob URLs against a fixed origin.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    origin: String,
    cdn_quality: Option<u8>,
}

impl UrlBuilder {
    /// `cdn_quality` enables proxy-derived variant URLs when set.
    pub fn new(origin: impl Into<String>, cdn_quality: Option<u8>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            cdn_quality,
        }
    }

    /// Use `PUBLIC_BASE_URL` when configured, otherwise the request's origin.
    pub fn for_request(config: &Config, headers: &HeaderMap) -> Self {
        let origin = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| request_origin(headers, config.port));
        let cdn_quality = config.cdn_image_proxy.then_some(config.image_quality);
        Self::new(origin, cdn_quality)
    }

    pub fn blob_url(&self, key: &str) -> String {
        format!("{}{}/{}", self.origin, BLOB_ROUTE_PREFIX, key)
    }

    pub fn image_urls(&self, record: &ImageRecord) -> ImageUrls {
        let original = self.blob_url(&record.paths.original);
        let webp = self.variant_url(record, &record.paths.webp, &original, CdnFormat::Webp);
        let avif = self.variant_url(record, &record.paths.avif, &original, CdnFormat::Avif);
        ImageUrls {
            original,
            webp,
            avif,
        }
    }

    fn variant_url(
        &self,
        record: &ImageRecord,
        key: &str,
        original: &str,
        format: CdnFormat,
    ) -> String {
        if !key.is_empty() {
            return self.blob_url(key);
        }
        match self.cdn_quality {
            Some(quality) if record.format.has_variants() => cdn_image_url(
                original,
                &CdnImageOptions {
                    quality: Some(quality),
                    ..CdnImageOptions::new(format)
                },
            ),
            _ => String::new(),
        }
    }
}

/// `scheme://host` of the incoming request, honoring `X-Forwarded-Proto`.
fn request_origin(headers: &HeaderMap, port: u16) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", port));
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|proto| matches!(*proto, "http" | "https"))
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

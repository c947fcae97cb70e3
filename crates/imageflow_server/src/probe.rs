//! Upload inspection: format sniffing and pixel dimensions.

use imageflow_core::models::ImageFormat;
use std::io::Cursor;

/// Dimensions recorded when the decoder cannot read them.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (1920, 1080);

/// Result of inspecting an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Identify the encoded format from leading magic bytes.
pub fn detect_format(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageFormat::Jpeg);
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some(ImageFormat::Png);
    }
    if data.starts_with(b"GIF8") {
        return Some(ImageFormat::Gif);
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" && matches!(&data[8..12], b"avif" | b"avis") {
        return Some(ImageFormat::Avif);
    }
    None
}

/// Inspect an upload.
///
/// # Returns
/// `None` when the bytes are not a supported image format. Dimensions fall
/// back to [`FALLBACK_DIMENSIONS`] when the header cannot be decoded.
pub fn probe(data: &[u8]) -> Option<ProbedImage> {
    let format = detect_format(data)?;
    let (width, height) = match read_dimensions(data, format) {
        Some((width, height)) if width > 0 && height > 0 => (width, height),
        _ => {
            tracing::warn!(
                "Could not read {} dimensions; recording {}x{}",
                format,
                FALLBACK_DIMENSIONS.0,
                FALLBACK_DIMENSIONS.1
            );
            FALLBACK_DIMENSIONS
        }
    };
    Some(ProbedImage {
        format,
        width,
        height,
    })
}

fn read_dimensions(data: &[u8], format: ImageFormat) -> Option<(u32, u32)> {
    let codec = match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Webp => image::ImageFormat::WebP,
        ImageFormat::Avif => return None,
    };
    image::ImageReader::with_format(Cursor::new(data), codec)
        .into_dimensions()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(format: image::ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn detects_formats_from_magic_bytes() {
        let mut webp = b"RIFF\0\0\0\0WEBPVP8 ".to_vec();
        webp.extend_from_slice(&[0; 8]);
        let avif = b"\0\0\0\x1cftypavif\0\0\0\0".to_vec();
        let avis = b"\0\0\0\x1cftypavis\0\0\0\0".to_vec();
        let heic = b"\0\0\0\x1cftypheic\0\0\0\0".to_vec();

        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(detect_format(b"\x89PNG\r\n\x1a\n"), Some(ImageFormat::Png));
        assert_eq!(detect_format(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(detect_format(&webp), Some(ImageFormat::Webp));
        assert_eq!(detect_format(&avif), Some(ImageFormat::Avif));
        assert_eq!(detect_format(&avis), Some(ImageFormat::Avif));
        assert_eq!(detect_format(&heic), None);
        assert_eq!(detect_format(b"hello world"), None);
        assert_eq!(detect_format(&[]), None);
    }

    #[test]
    fn probe_reads_real_dimensions() {
        let png = encode(image::ImageFormat::Png, 40, 30);
        assert_eq!(
            probe(&png),
            Some(ProbedImage {
                format: ImageFormat::Png,
                width: 40,
                height: 30
            })
        );

        let jpeg = encode(image::ImageFormat::Jpeg, 20, 50);
        let probed = probe(&jpeg).unwrap();
        assert_eq!(probed.format, ImageFormat::Jpeg);
        assert_eq!((probed.width, probed.height), (20, 50));
    }

    #[test]
    fn probe_falls_back_when_header_is_unreadable() {
        let truncated = b"\x89PNG\r\n\x1a\n".to_vec();
        let probed = probe(&truncated).unwrap();
        assert_eq!(probed.format, ImageFormat::Png);
        assert_eq!((probed.width, probed.height), FALLBACK_DIMENSIONS);

        let avif = b"\0\0\0\x1cftypavif\0\0\0\0".to_vec();
        let probed = probe(&avif).unwrap();
        assert_eq!(probed.format, ImageFormat::Avif);
        assert_eq!((probed.width, probed.height), FALLBACK_DIMENSIONS);
    }

    #[test]
    fn probe_rejects_unknown_bytes() {
        assert!(probe(b"not an image at all").is_none());
    }
}

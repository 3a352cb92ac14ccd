//! Image renderer (§4.5): serves an original, or a re-encoded view of its
//! thumbnail sidecar, at one of three quality levels.

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Deserialize;
use std::io::Cursor;

use crate::error::{AppError, AppResult};

const HIGH_LONG_EDGE: u32 = 1920;
const HIGH_JPEG_QUALITY: u8 = 85;

/// The three render qualities a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Full,
    High,
    Thumbnail,
}

/// Result of a render: bytes plus the content-type header value to send.
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// `full`: stream the original unchanged, content-type from its extension.
pub async fn render_full(original_path: &Path) -> AppResult<Rendered> {
    let bytes = tokio::fs::read(original_path)
        .await
        .map_err(|_| AppError::NotFound)?;
    Ok(Rendered {
        bytes,
        content_type: mime_for_extension(original_path),
    })
}

/// `high`: decode the thumbnail sidecar, orient it, upsize to a 1920px
/// longest edge, encode JPEG at quality 85.
pub fn render_high(thumb_bytes: &[u8], orientation: u32) -> AppResult<Rendered> {
    let img = image::load_from_memory(thumb_bytes)
        .map_err(|e| AppError::Internal(format!("failed to decode thumbnail: {e}")))?;
    let img = apply_orientation(img, orientation);
    let resized = img.resize(HIGH_LONG_EDGE, HIGH_LONG_EDGE, FilterType::Lanczos3);

    let mut buf = Cursor::new(Vec::new());
    resized
        .write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut buf,
            HIGH_JPEG_QUALITY,
        ))
        .map_err(|e| AppError::Internal(format!("failed to encode jpeg: {e}")))?;

    Ok(Rendered {
        bytes: buf.into_inner(),
        content_type: "image/jpeg".to_string(),
    })
}

/// `thumbnail`: decode the thumbnail sidecar and re-encode as PNG.
pub fn render_thumbnail(thumb_bytes: &[u8]) -> AppResult<Rendered> {
    let img = image::load_from_memory(thumb_bytes)
        .map_err(|e| AppError::Internal(format!("failed to decode thumbnail: {e}")))?;
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("failed to encode png: {e}")))?;
    Ok(Rendered {
        bytes: buf.into_inner(),
        content_type: "image/png".to_string(),
    })
}

/// Applies the EXIF orientation transform table from §4.5. Values outside
/// `1..=8` are treated as `1` (identity) — never an error.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.fliph().rotate270(),
        6 => img.rotate90(),
        7 => img.fliph().rotate90(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Reads the orientation field out of a metadata sidecar's JSON, walking
/// `[0].Fields.Orientation`. Defaults to `1` on any shape mismatch, missing
/// file, or parse failure — never an error (§4.5).
pub async fn orientation_of(metadata_path: &Path) -> u32 {
    let Ok(bytes) = tokio::fs::read(metadata_path).await else {
        return 1;
    };
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return 1;
    };
    value[0]["Fields"]["Orientation"]
        .as_u64()
        .map(|v| v as u32)
        .unwrap_or(1)
}

fn mime_for_extension(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(w, h, |_, _| Rgb([10u8, 20, 30]));
        let dynamic = DynamicImage::ImageRgb8(img);
        let mut buf = Cursor::new(Vec::new());
        dynamic.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn orientation_6_rotates_dimensions() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(100, 50, |_, _| Rgb([0, 0, 0])));
        let rotated = apply_orientation(img, 6);
        assert_eq!((rotated.width(), rotated.height()), (50, 100));
    }

    #[test]
    fn out_of_range_orientation_is_identity() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(100, 50, |_, _| Rgb([0, 0, 0])));
        let unchanged = apply_orientation(img, 42);
        assert_eq!((unchanged.width(), unchanged.height()), (100, 50));
    }

    #[test]
    fn high_render_is_jpeg() {
        let thumb = sample_bytes(250, 250);
        let rendered = render_high(&thumb, 1).unwrap();
        assert_eq!(rendered.content_type, "image/jpeg");
        assert!(image::load_from_memory(&rendered.bytes).is_ok());
    }

    #[test]
    fn thumbnail_render_is_png() {
        let thumb = sample_bytes(250, 250);
        let rendered = render_thumbnail(&thumb).unwrap();
        assert_eq!(rendered.content_type, "image/png");
    }

    #[tokio::test]
    async fn missing_metadata_defaults_orientation_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(orientation_of(&missing).await, 1);
    }

    #[tokio::test]
    async fn reads_orientation_from_sidecar_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg.json");
        tokio::fs::write(&path, br#"[{"Fields":{"Orientation":6}}]"#)
            .await
            .unwrap();
        assert_eq!(orientation_of(&path).await, 6);
    }
}

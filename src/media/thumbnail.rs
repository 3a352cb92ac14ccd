//! Thumbnail construction (§4.2 phase 2).
//!
//! Both branches share the same resize-then-fill pipeline: shrink so the
//! longest edge is 300px, then scale-to-cover and center-crop to exactly
//! 250×250. Images are written as PNG, video frames as JPEG.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::error::{AppError, AppResult};
use crate::render;

const LONG_EDGE: u32 = 300;
const FILL_SIZE: u32 = 250;

/// Decodes an image, applies its EXIF orientation, and produces 250×250
/// PNG thumbnail bytes.
pub fn build_image_thumbnail(data: &[u8], orientation: u32) -> AppResult<Vec<u8>> {
    let img = image::load_from_memory(data)
        .map_err(|e| AppError::Internal(format!("failed to decode image for thumbnail: {e}")))?;
    let img = render::apply_orientation(img, orientation);
    let thumb = resize_then_fill(&img);
    encode(&thumb, ImageFormat::Png)
}

/// Takes a raw JPEG video frame and produces 250×250 JPEG thumbnail bytes.
pub fn build_video_thumbnail(frame_jpeg: &[u8]) -> AppResult<Vec<u8>> {
    let img = image::load_from_memory(frame_jpeg)
        .map_err(|e| AppError::Internal(format!("failed to decode video frame: {e}")))?;
    let thumb = resize_then_fill(&img);
    encode(&thumb, ImageFormat::Jpeg)
}

fn resize_then_fill(img: &DynamicImage) -> DynamicImage {
    let shrunk = img.resize(LONG_EDGE, LONG_EDGE, FilterType::Lanczos3);
    fill_center(&shrunk, FILL_SIZE, FILL_SIZE)
}

/// Scales `img` up (preserving aspect) until it covers a `w`×`h` box, then
/// crops the center — the "resize to fill" behavior thumbnail generation
/// wants instead of letterboxing.
fn fill_center(img: &DynamicImage, w: u32, h: u32) -> DynamicImage {
    let (iw, ih) = (img.width().max(1), img.height().max(1));
    let scale = (w as f64 / iw as f64).max(h as f64 / ih as f64);
    let new_w = ((iw as f64 * scale).round() as u32).max(w);
    let new_h = ((ih as f64 * scale).round() as u32).max(h);
    let resized = img.resize_exact(new_w, new_h, FilterType::Lanczos3);
    let x = (new_w - w) / 2;
    let y = (new_h - h) / 2;
    resized.crop_imm(x, y, w, h)
}

fn encode(img: &DynamicImage, format: ImageFormat) -> AppResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .map_err(|e| AppError::Internal(format!("failed to encode thumbnail: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_png(w: u32, h: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(w, h, |_, _| Rgb([200u8, 100, 50]));
        let dynamic = DynamicImage::ImageRgb8(img);
        let mut buf = Cursor::new(Vec::new());
        dynamic.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn image_thumbnail_is_exactly_250x250() {
        let data = sample_png(800, 400);
        let out = build_image_thumbnail(&data, 1).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (250, 250));
    }

    #[test]
    fn video_thumbnail_is_exactly_250x250() {
        let data = sample_png(150, 600);
        let out = build_video_thumbnail(&data).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (250, 250));
    }
}

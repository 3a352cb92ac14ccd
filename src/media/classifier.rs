//! Document classification (§4.2 phase 3, §4.6): a built-in brightness
//! heuristic plus an optional external subprocess classifier.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::AppResult;

const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(30);
const HEURISTIC_RESIZE_WIDTH: u32 = 200;
const MIN_DIMENSION: u32 = 10;
const BRIGHTNESS_THRESHOLD: f64 = 120.0;
const LIGHT_THRESHOLD: u8 = 240;
const DARK_THRESHOLD: u8 = 25;
const EXTREME_RATIO_THRESHOLD: f64 = 0.28;

/// Decodes an image, resizes it to 200px wide preserving aspect, and
/// returns true if it looks like a scanned document: bright overall, with
/// a substantial share of near-white/near-black pixels (text on a page).
/// Images smaller than 10×10 after resize are never classified as
/// documents — there isn't enough signal.
pub fn looks_like_document(data: &[u8]) -> AppResult<bool> {
    let img = image::load_from_memory(data)
        .map_err(|e| crate::error::AppError::Internal(format!("failed to decode image: {e}")))?;
    let resized = img.resize(HEURISTIC_RESIZE_WIDTH, u32::MAX, FilterType::Triangle);

    if resized.width() < MIN_DIMENSION || resized.height() < MIN_DIMENSION {
        return Ok(false);
    }

    let mut sum: u64 = 0;
    let mut light: u64 = 0;
    let mut dark: u64 = 0;
    let mut total: u64 = 0;

    for (_, _, pixel) in resized.pixels() {
        let [r, g, b, _] = pixel.0;
        let brightness = (r as u32 + g as u32 + b as u32) / 3;
        sum += brightness as u64;
        if brightness as u8 >= LIGHT_THRESHOLD {
            light += 1;
        } else if brightness as u8 <= DARK_THRESHOLD {
            dark += 1;
        }
        total += 1;
    }

    if total == 0 {
        return Ok(false);
    }

    let mean = sum as f64 / total as f64;
    let extreme_ratio = (light + dark) as f64 / total as f64;

    Ok(mean >= BRIGHTNESS_THRESHOLD && extreme_ratio >= EXTREME_RATIO_THRESHOLD)
}

/// An external document classifier subprocess: invoked with the absolute
/// image path, "document" (case-insensitive) anywhere in stdout means yes.
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    async fn classify(&self, file: &Path) -> std::io::Result<bool>;
}

pub struct ExternalClassifier {
    pub tool_path: String,
}

impl ExternalClassifier {
    pub fn new(tool_path: impl Into<String>) -> Self {
        Self {
            tool_path: tool_path.into(),
        }
    }
}

#[async_trait]
impl DocumentClassifier for ExternalClassifier {
    async fn classify(&self, file: &Path) -> std::io::Result<bool> {
        let run = tokio::process::Command::new(&self.tool_path)
            .arg(file)
            .stdin(Stdio::null())
            .output();

        let output = match tokio::time::timeout(CLASSIFIER_TIMEOUT, run).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(file = %file.display(), "document classifier timed out");
                return Ok(false);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
        Ok(stdout.contains("document"))
    }
}

/// In-memory fake for tests.
pub struct FakeClassifier {
    pub result: bool,
}

#[async_trait]
impl DocumentClassifier for FakeClassifier {
    async fn classify(&self, _file: &Path) -> std::io::Result<bool> {
        Ok(self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn png_of(w: u32, h: u32, pixel: [u8; 3]) -> Vec<u8> {
        let img = ImageBuffer::from_fn(w, h, |_, _| Rgb(pixel));
        let dynamic = image::DynamicImage::ImageRgb8(img);
        let mut buf = Cursor::new(Vec::new());
        dynamic
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn blank_white_image_looks_like_a_document() {
        let data = png_of(400, 600, [255, 255, 255]);
        assert!(looks_like_document(&data).unwrap());
    }

    #[test]
    fn mid_gray_photo_does_not_look_like_a_document() {
        let data = png_of(400, 600, [128, 120, 110]);
        assert!(!looks_like_document(&data).unwrap());
    }

    #[test]
    fn tiny_image_never_classifies_as_document() {
        let data = png_of(5, 5, [255, 255, 255]);
        assert!(!looks_like_document(&data).unwrap());
    }
}

//! Video frame extraction (§4.2 phase 2 video branch, §6 video frame
//! extractor).

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;

/// Extracts a single frame from a video file as JPEG bytes.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_frame(&self, file: &Path, frame_index: u32) -> std::io::Result<Vec<u8>>;
}

/// Shells out to ffmpeg, selecting `frame_index` and writing a single JPEG
/// frame to stdout.
pub struct FfmpegExtractor {
    pub tool_path: String,
}

impl FfmpegExtractor {
    pub fn new(tool_path: impl Into<String>) -> Self {
        Self {
            tool_path: tool_path.into(),
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract_frame(&self, file: &Path, frame_index: u32) -> std::io::Result<Vec<u8>> {
        let filter = format!("select=eq(n\\,{frame_index})");
        let output = tokio::process::Command::new(&self.tool_path)
            .arg("-i")
            .arg(file)
            .arg("-vf")
            .arg(&filter)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("mjpeg")
            .arg("-")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            ));
        }
        Ok(output.stdout)
    }
}

/// In-memory fake for tests: returns a fixed JPEG (or arbitrary bytes)
/// regardless of input.
#[derive(Clone)]
pub struct FakeFrameExtractor {
    pub frame: Vec<u8>,
}

#[async_trait]
impl FrameExtractor for FakeFrameExtractor {
    async fn extract_frame(&self, _file: &Path, _frame_index: u32) -> std::io::Result<Vec<u8>> {
        Ok(self.frame.clone())
    }
}

//! EXIF/media metadata extraction (§4.2 phase 1, §6 EXIF extractor).
//!
//! The extractor itself is an external binary (exiftool). This module wraps
//! it behind a small trait so workers can be exercised in tests with an
//! in-memory fake instead of shelling out.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;

/// Runs the external EXIF/media metadata extractor against a file and
/// returns its raw stdout, which is written verbatim to `meta(P)` (the
/// extractor's JSON schema is a third party's; this system only reads
/// `[0].Fields.Orientation` back out of it later).
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, file: &Path) -> std::io::Result<Vec<u8>>;
}

/// Shells out to the configured exiftool binary: `exiftool <file> -json`.
pub struct ExifToolExtractor {
    pub tool_path: String,
}

impl ExifToolExtractor {
    pub fn new(tool_path: impl Into<String>) -> Self {
        Self {
            tool_path: tool_path.into(),
        }
    }
}

#[async_trait]
impl MetadataExtractor for ExifToolExtractor {
    async fn extract(&self, file: &Path) -> std::io::Result<Vec<u8>> {
        let output = tokio::process::Command::new(&self.tool_path)
            .arg(file)
            .arg("-json")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "exiftool exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            ));
        }
        Ok(output.stdout)
    }
}

/// In-memory fake for tests: returns a fixed JSON document regardless of
/// input, so a test can control what `render::orientation_of` later reads.
#[derive(Clone)]
pub struct FakeExtractor {
    pub output: Vec<u8>,
}

impl FakeExtractor {
    pub fn with_orientation(orientation: u32) -> Self {
        let json = format!(r#"[{{"Fields":{{"Orientation":{orientation}}}}}]"#);
        Self {
            output: json.into_bytes(),
        }
    }
}

#[async_trait]
impl MetadataExtractor for FakeExtractor {
    async fn extract(&self, _file: &Path) -> std::io::Result<Vec<u8>> {
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_extractor_returns_fixed_output() {
        let extractor = FakeExtractor::with_orientation(6);
        let out = extractor.extract(Path::new("/any/path.jpg")).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json[0]["Fields"]["Orientation"], 6);
    }
}

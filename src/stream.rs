//! Stream server (§4.7): HTTP Range-aware serving of video/audio originals.

use std::path::Path;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};

/// An inclusive byte range, already resolved against a known file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Parses a `Range: bytes=start-end` header value against `size`.
///
/// Missing `start` defaults to 0; missing `end` defaults to `size - 1`;
/// `end >= size` clamps to `size - 1`. Returns `None` for anything that
/// isn't the `bytes=` form, or where `start > end` — both map to `416` at
/// the call site.
pub fn parse_range(header_value: &str, size: u64) -> Option<ByteRange> {
    let spec = header_value.strip_prefix("bytes=")?;
    let mut parts = spec.splitn(2, '-');
    let start_str = parts.next()?;
    let end_str = parts.next()?;

    if start_str.is_empty() && end_str.is_empty() {
        return None;
    }

    let start: u64 = if start_str.is_empty() {
        0
    } else {
        start_str.parse().ok()?
    };
    let end: u64 = if end_str.is_empty() {
        size.saturating_sub(1)
    } else {
        end_str.parse::<u64>().ok()?.min(size.saturating_sub(1))
    };

    if start > end || start >= size {
        return None;
    }

    Some(ByteRange { start, end })
}

/// Serves `path` with Range support. `content_type` is resolved by the
/// caller (sniff first, extension fallback, per §4.7).
pub async fn serve_file(
    path: &Path,
    content_type: &str,
    range_header: Option<&str>,
) -> AppResult<Response> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| AppError::NotFound)?;
    let size = metadata.len();

    if let Some(raw_range) = range_header {
        return match parse_range(raw_range, size) {
            Some(range) => serve_range(path, content_type, size, range).await,
            None => Ok((
                StatusCode::RANGE_NOT_SATISFIABLE,
                [
                    (header::CONTENT_RANGE, format!("bytes */{size}")),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
            )
                .into_response()),
        };
    }

    let file = tokio::fs::File::open(path).await?;
    let stream = ReaderStream::new(file);
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_DISPOSITION, "inline")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

async fn serve_range(
    path: &Path,
    content_type: &str,
    size: u64,
    range: ByteRange,
) -> AppResult<Response> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(range.start)).await?;

    let length = range.end - range.start + 1;
    let limited = file.take(length);
    let stream = ReaderStream::new(limited);

    Ok(Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length.to_string())
        .header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{size}", range.start, range.end),
        )
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_DISPOSITION, "inline")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// Sniffs the first 512 bytes of `path`, falling back to an extension table
/// for known video/audio container types.
pub async fn content_type_of(path: &Path) -> String {
    if let Ok(mut file) = tokio::fs::File::open(path).await {
        let mut buf = [0u8; 512];
        if let Ok(n) = file.read(&mut buf).await {
            if let Some(kind) = infer::get(&buf[..n]) {
                return kind.mime_type().to_string();
            }
        }
    }
    extension_mime(path)
}

fn extension_mime(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_range_header_parsing_needed_for_full_body() {
        assert_eq!(parse_range("bytes=0-", 1_048_576), Some(ByteRange { start: 0, end: 1_048_575 }));
    }

    #[test]
    fn exact_range_within_bounds() {
        assert_eq!(
            parse_range("bytes=100-199", 1_048_576),
            Some(ByteRange { start: 100, end: 199 })
        );
    }

    #[test]
    fn missing_start_defaults_to_zero() {
        assert_eq!(parse_range("bytes=-499", 1000), Some(ByteRange { start: 0, end: 499 }));
    }

    #[test]
    fn end_beyond_size_clamps() {
        assert_eq!(parse_range("bytes=900-2000", 1000), Some(ByteRange { start: 900, end: 999 }));
    }

    #[test]
    fn start_greater_than_end_is_unsatisfiable() {
        assert_eq!(parse_range("bytes=500-100", 1000), None);
    }

    #[test]
    fn start_at_or_beyond_size_is_unsatisfiable() {
        assert_eq!(parse_range("bytes=1000-1001", 1000), None);
    }

    #[test]
    fn malformed_header_is_unsatisfiable() {
        assert_eq!(parse_range("not-a-range", 1000), None);
        assert_eq!(parse_range("bytes=abc-def", 1000), None);
    }

    #[tokio::test]
    async fn serves_full_body_without_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, vec![7u8; 1024]).await.unwrap();
        let resp = serve_file(&path, "application/octet-stream", None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn serves_partial_content_for_valid_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, vec![7u8; 1_048_576]).await.unwrap();
        let resp = serve_file(&path, "video/mp4", Some("bytes=100-199"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 100);
    }

    #[tokio::test]
    async fn range_not_satisfiable_returns_416() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, vec![1u8; 100]).await.unwrap();
        let resp = serve_file(&path, "video/mp4", Some("bytes=500-100"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }
}

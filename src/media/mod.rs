//! Media-kind classification and the subprocess adapters that back the
//! worker pipeline (§4.2, §4.6).

pub mod classifier;
pub mod frame;
pub mod metadata;
pub mod thumbnail;

use std::fmt;

/// The coarse kind of an uploaded file, derived from sniffing its first
/// bytes. Exhaustively handled everywhere it's matched on — no catch-all
/// fallback to "treat like an image".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The suffix a thumbnail file carries relative to its source's own
/// extension: images keep their own extension (thumbnail builder picks the
/// format), everything else is written as a `.jpeg` frame grab and needs the
/// suffix appended to the source's relative path.
pub fn thumb_ext(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "",
        MediaKind::Video | MediaKind::Audio | MediaKind::Unknown => ".jpeg",
    }
}

/// Sniffs a buffer (expected to be the first 512 bytes of a part/file) and
/// classifies it by top-level MIME type. Anything that isn't recognized as
/// image/video/audio is `Unknown` — the upload pipeline rejects those,
/// while internal callers (thumbnail rebuild, admin walks) use extension
/// allowlists instead (`paths::is_image_path`/`is_video_path`).
pub fn sniff(buf: &[u8]) -> MediaKind {
    match infer::get(buf) {
        Some(kind) => {
            let mime = kind.mime_type();
            if mime.starts_with("image/") {
                MediaKind::Image
            } else if mime.starts_with("video/") {
                MediaKind::Video
            } else if mime.starts_with("audio/") {
                MediaKind::Audio
            } else {
                MediaKind::Unknown
            }
        }
        None => MediaKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn sniffs_png_as_image() {
        assert_eq!(sniff(PNG_HEADER), MediaKind::Image);
    }

    #[test]
    fn sniffs_garbage_as_unknown() {
        assert_eq!(sniff(b"not a media file at all"), MediaKind::Unknown);
    }
}

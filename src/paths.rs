//! Canonical path construction for the storage tree.
//!
//! Every handler and service goes through this module instead of
//! concatenating raw strings — it is the single place that knows the realm
//! rules (`Trash/` prefix), the sidecar layout (`Thumbnails/`, `Metadata/`),
//! and what counts as a safe relative path.

use chrono::Datelike;
use std::path::{Component, Path, PathBuf};

pub const TRASH: &str = "Trash";
pub const THUMBNAILS: &str = "Thumbnails";
pub const METADATA: &str = "Metadata";

/// Converts a path to forward-slash form, the API's on-the-wire shape.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Strips a single leading `/` if present.
pub fn trim_leading_separator(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Validates a relative path `P` per invariant §3(3): no empty component,
/// never `..`, never resolves above the device root, always forward-slash
/// on the wire.
pub fn is_safe_relative(rel: &str) -> bool {
    if rel.is_empty() {
        return false;
    }
    let normalized = normalize(rel);
    if normalized.starts_with('/') {
        return false;
    }
    let path = Path::new(&normalized);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => return false,
        }
    }
    true
}

/// True when `rel` (already normalized, forward-slash) addresses the Trash
/// realm, i.e. it is exactly `Trash` or starts with `Trash/`.
pub fn is_trash_path(rel: &str) -> bool {
    let norm = normalize(rel);
    norm == TRASH || norm.starts_with(&format!("{TRASH}/"))
}

/// Returns the thumbnail storage path for a file at relative path `file`,
/// rooted at `user_dir` (the device directory). Realm is preserved: a
/// `Trash/...` file gets its thumbnail under `Trash/Thumbnails/...`.
pub fn thumbnail_base_path(user_dir: &Path, file: &str) -> PathBuf {
    let file = normalize(file);
    let file = file.trim();
    let parts: Vec<&str> = file.split('/').collect();
    if parts.first().is_some_and(|p| p.eq_ignore_ascii_case(TRASH)) {
        let rest = parts[1..].join("/");
        user_dir.join(TRASH).join(THUMBNAILS).join(rest)
    } else {
        user_dir.join(THUMBNAILS).join(file)
    }
}

/// Returns the metadata JSON storage path for a file at relative path
/// `file`, rooted at `user_dir`. Mirrors `thumbnail_base_path`'s realm
/// handling.
pub fn metadata_path(user_dir: &Path, file: &str) -> PathBuf {
    let file = normalize(file);
    let file = file.trim();
    let parts: Vec<&str> = file.split('/').collect();
    if parts.first().is_some_and(|p| p.eq_ignore_ascii_case(TRASH)) {
        let rest = parts[1..].join("/");
        user_dir
            .join(TRASH)
            .join(METADATA)
            .join(format!("{rest}.json"))
    } else {
        user_dir.join(METADATA).join(format!("{file}.json"))
    }
}

/// True if `rel` (already normalized) sits inside a `Metadata` directory at
/// any depth.
pub fn is_under_metadata(rel: &str) -> bool {
    let norm = normalize(trim_leading_separator(rel));
    norm == METADATA
        || norm.starts_with(&format!("{METADATA}/"))
        || norm.contains(&format!("/{METADATA}/"))
}

/// True if `rel` sits inside `Trash`, `Thumbnails`, or `Metadata` and should
/// therefore be excluded from folder/file listings.
pub fn should_skip_in_folder_listing(rel: &str) -> bool {
    let norm = normalize(trim_leading_separator(rel));
    if norm == TRASH || norm.starts_with(&format!("{TRASH}/")) {
        return true;
    }
    if norm == THUMBNAILS
        || norm.starts_with(&format!("{THUMBNAILS}/"))
        || norm.contains(&format!("/{THUMBNAILS}/"))
    {
        return true;
    }
    is_under_metadata(rel)
}

/// True if the file extension looks like a still image this system's
/// renderer/thumbnailer knows how to decode.
pub fn is_image_path(path: &str) -> bool {
    match extension_lower(path) {
        Some(ext) => matches!(
            ext.as_str(),
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "heic"
        ),
        None => false,
    }
}

/// True if the file extension is one of the video containers the admin
/// thumbnail-regeneration job knows how to frame-grab.
pub fn is_video_path(path: &str) -> bool {
    matches!(
        extension_lower(path).as_deref(),
        Some("mp4" | "mov" | "avi" | "mkv" | "webm")
    )
}

/// Derives the thumbnail suffix for a relative path from its extension,
/// mirroring `media::thumb_ext` for callers that only have the path (not a
/// sniffed `MediaKind`): image extensions keep the thumbnail unsuffixed,
/// everything else gets `.jpeg` appended for the frame-grab thumbnail.
pub fn thumb_ext_for_file(path: &str) -> &'static str {
    if is_image_path(path) {
        ""
    } else {
        ".jpeg"
    }
}

fn extension_lower(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Clamps a client-supplied year/month pair to the valid range per
/// invariant §3(4): month in `1..=12`, year in `[2000, current_year]`. Out
/// of range values are silently replaced with the server's current
/// year/month rather than rejected.
pub fn clamp_year_month(year: i32, month: u32) -> (i32, u32) {
    let now = chrono::Utc::now();
    let current_year = now.year();
    let current_month = now.month();

    let year_ok = (2000..=current_year).contains(&year);
    let month_ok = (1..=12).contains(&month);

    if year_ok && month_ok {
        (year, month)
    } else {
        (current_year, current_month)
    }
}

/// Parses a `date` header value of the form `YYYY-M` or `YYYY-MM` into a
/// clamped `(year, month)` pair. Returns `None` if it does not have at
/// least two dash-separated components or the numeric parts don't parse.
pub fn parse_and_clamp_date(date: &str) -> Option<(i32, u32)> {
    let mut parts = date.splitn(2, '-');
    let year_str = parts.next()?;
    let month_str = parts.next()?;
    if month_str.is_empty() {
        return None;
    }
    let year: i32 = year_str.trim().parse().ok()?;
    let month: u32 = month_str.trim().parse().ok()?;
    Some(clamp_year_month(year, month))
}

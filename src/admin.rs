//! Admin operations (§4.9): bulk thumbnail regeneration, orphan reaping,
//! and batch document detection.

use std::path::Path;

use serde::Serialize;

use crate::error::AppResult;
use crate::media::MediaKind;
use crate::paths;
use crate::worker::{self, WorkerDeps};

#[derive(Debug, Serialize)]
pub struct RegenerateResult {
    #[serde(rename = "Regenerated")]
    pub regenerated: u64,
}

#[derive(Debug, Serialize)]
pub struct CleanOrphansResult {
    #[serde(rename = "Removed")]
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct DocumentDetectionResult {
    #[serde(rename = "Moved")]
    pub moved: u64,
}

/// Walks live originals, rebuilding thumbnails for images and known video
/// extensions. Idempotent in effect (R3).
pub async fn regenerate_thumbnails(deps: &WorkerDeps, user_dir: &Path) -> AppResult<RegenerateResult> {
    let mut regenerated = 0u64;
    let mut stack = vec![user_dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let rel = path
                .strip_prefix(user_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();
            let rel = paths::normalize(&rel);

            if entry.file_type().await?.is_dir() {
                if !paths::should_skip_in_folder_listing(&rel) {
                    stack.push(path);
                }
                continue;
            }

            if paths::should_skip_in_folder_listing(&rel) {
                continue;
            }

            let kind = if paths::is_image_path(&rel) {
                MediaKind::Image
            } else if paths::is_video_path(&rel) {
                MediaKind::Video
            } else {
                continue;
            };

            worker::build_thumbnail_phase(deps, user_dir, &rel, kind).await;
            regenerated += 1;
        }
    }

    Ok(RegenerateResult { regenerated })
}

/// Walks `Thumbnails/` and `Trash/Thumbnails/`; removes a thumbnail (and
/// its metadata sidecar) whose source original no longer exists in the
/// corresponding realm (I7).
pub async fn clean_orphan_thumbnails(user_dir: &Path) -> AppResult<CleanOrphansResult> {
    let mut removed = 0u64;

    for thumb_root_rel in [paths::THUMBNAILS.to_string(), format!("{}/{}", paths::TRASH, paths::THUMBNAILS)] {
        let thumb_root = user_dir.join(&thumb_root_rel);
        if tokio::fs::metadata(&thumb_root).await.is_err() {
            continue;
        }

        let mut stack = vec![thumb_root.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    stack.push(path);
                    continue;
                }

                let thumb_rel = path
                    .strip_prefix(user_dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                let thumb_rel = paths::normalize(&thumb_rel);

                let inside_realm_rel = thumb_rel
                    .strip_prefix(&format!("{thumb_root_rel}/"))
                    .unwrap_or(&thumb_rel)
                    .to_string();
                let source_rel = inside_realm_rel
                    .strip_suffix(".jpeg")
                    .unwrap_or(&inside_realm_rel)
                    .to_string();
                let realm_prefix = thumb_root_rel
                    .strip_suffix(&format!("/{}", paths::THUMBNAILS))
                    .unwrap_or("")
                    .to_string();
                let source_full_rel = if realm_prefix.is_empty() {
                    source_rel.clone()
                } else {
                    format!("{realm_prefix}/{source_rel}")
                };

                let source_path = user_dir.join(&source_full_rel);
                if tokio::fs::metadata(&source_path).await.is_err() {
                    let _ = tokio::fs::remove_file(&path).await;
                    let meta_path = paths::metadata_path(user_dir, &source_full_rel);
                    let _ = tokio::fs::remove_file(&meta_path).await;
                    removed += 1;
                }
            }
        }
    }

    Ok(CleanOrphansResult { removed })
}

/// Walks live originals; for each image, classifies it (external tool if
/// configured, else the built-in heuristic) and moves matches to Trash.
pub async fn run_document_detection(
    deps: &WorkerDeps,
    user_dir: &Path,
) -> AppResult<DocumentDetectionResult> {
    let mut moved = 0u64;
    let mut stack = vec![user_dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let rel = path
                .strip_prefix(user_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();
            let rel = paths::normalize(&rel);

            if entry.file_type().await?.is_dir() {
                if !paths::should_skip_in_folder_listing(&rel) {
                    stack.push(path);
                }
                continue;
            }

            if paths::should_skip_in_folder_listing(&rel) || !paths::is_image_path(&rel) {
                continue;
            }

            let before = tokio::fs::metadata(user_dir.join(&rel)).await.is_ok();
            worker::classify_and_maybe_trash_phase(deps, user_dir, &rel).await?;
            let after = tokio::fs::metadata(user_dir.join(&rel)).await.is_ok();
            if before && !after {
                moved += 1;
            }
        }
    }

    Ok(DocumentDetectionResult { moved })
}

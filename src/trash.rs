//! Trash manager (§4.4): move / restore / empty with associated-file
//! coherency, and orphan-free listing of the Trash realm.

use std::path::Path;

use crate::error::AppResult;
use crate::paths::{self, TRASH};
use crate::storage;

/// Moves `rel` (a live-realm relative path) and its sidecars into `Trash/`.
/// Rejects `rel` per §4.4's guard clauses by returning `Ok(())` without
/// doing anything — mirroring the source's "reject silently" shape for a
/// background-job caller; HTTP callers validate `rel` before calling this.
///
/// The primary rename determines success: if it fails, no sidecar move is
/// attempted. Sidecar failures are best-effort and never surfaced.
pub async fn move_to_trash(user_dir: &Path, rel: &str) -> AppResult<()> {
    let rel = paths::normalize(rel);
    if rel.is_empty() || rel.contains("..") || rel == TRASH || paths::is_trash_path(&rel) {
        return Ok(());
    }

    let original = user_dir.join(&rel);
    let trashed = user_dir.join(TRASH).join(&rel);

    if !storage::move_if_exists(&original, &trashed).await? {
        return Ok(());
    }

    let thumb_ext = paths::thumb_ext_for_file(&rel);
    let thumb_src = paths::thumbnail_base_path(user_dir, &format!("{rel}{thumb_ext}"));
    let thumb_dst = paths::thumbnail_base_path(user_dir, &format!("{TRASH}/{rel}{thumb_ext}"));
    if let Err(e) = storage::move_if_exists(&thumb_src, &thumb_dst).await {
        tracing::warn!(rel, error = %e, "failed to move thumbnail sidecar to trash");
    }

    let meta_src = paths::metadata_path(user_dir, &rel);
    let meta_dst = paths::metadata_path(user_dir, &format!("{TRASH}/{rel}"));
    if let Err(e) = storage::move_if_exists(&meta_src, &meta_dst).await {
        tracing::warn!(rel, error = %e, "failed to move metadata sidecar to trash");
    }

    Ok(())
}

/// Restores `trash_rel` (without the `Trash/` prefix) from Trash back to
/// the live realm, along with its sidecars. Mirror of [`move_to_trash`].
pub async fn restore_from_trash(user_dir: &Path, trash_rel: &str) -> AppResult<()> {
    let rel = paths::normalize(trash_rel);
    if rel.is_empty() || rel.contains("..") {
        return Ok(());
    }

    let trashed = user_dir.join(TRASH).join(&rel);
    let original = user_dir.join(&rel);

    if !storage::move_if_exists(&trashed, &original).await? {
        return Ok(());
    }

    let thumb_ext = paths::thumb_ext_for_file(&rel);
    let thumb_src = paths::thumbnail_base_path(user_dir, &format!("{TRASH}/{rel}{thumb_ext}"));
    let thumb_dst = paths::thumbnail_base_path(user_dir, &format!("{rel}{thumb_ext}"));
    if let Err(e) = storage::move_if_exists(&thumb_src, &thumb_dst).await {
        tracing::warn!(rel, error = %e, "failed to restore thumbnail sidecar from trash");
    }

    let meta_src = paths::metadata_path(user_dir, &format!("{TRASH}/{rel}"));
    let meta_dst = paths::metadata_path(user_dir, &rel);
    if let Err(e) = storage::move_if_exists(&meta_src, &meta_dst).await {
        tracing::warn!(rel, error = %e, "failed to restore metadata sidecar from trash");
    }

    Ok(())
}

/// Removes the entire `Trash/` subtree of a device directory. Absent
/// `Trash/` is not an error; a second call is a no-op (R2).
pub async fn empty_trash(user_dir: &Path) -> AppResult<()> {
    let trash_dir = user_dir.join(TRASH);
    storage::remove_dir_all_writable(&trash_dir).await?;
    Ok(())
}

/// Lists files under `Trash/`, excluding `Trash/Thumbnails/` and
/// `Trash/Metadata/`, as forward-slash paths rooted at the device
/// directory (e.g. `Trash/2024/7/a.jpg`).
pub async fn list_trash_files(user_dir: &Path) -> AppResult<Vec<String>> {
    let trash_dir = user_dir.join(TRASH);
    if tokio::fs::metadata(&trash_dir).await.is_err() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let mut stack = vec![trash_dir.clone()];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            let rel = path
                .strip_prefix(user_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();
            let rel = paths::normalize(&rel);
            if rel.starts_with(&format!("{TRASH}/{}/", paths::THUMBNAILS))
                || rel.starts_with(&format!("{TRASH}/{}/", paths::METADATA))
            {
                continue;
            }
            out.push(rel);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write(path: &Path, data: &[u8]) {
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, data).await.unwrap();
    }

    #[tokio::test]
    async fn move_to_trash_carries_original_and_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path();
        write(&user_dir.join("2024/7/a.jpg"), b"orig").await;
        write(&user_dir.join("Thumbnails/2024/7/a.jpg"), b"thumb").await;
        write(&user_dir.join("Metadata/2024/7/a.jpg.json"), b"{}").await;

        move_to_trash(user_dir, "2024/7/a.jpg").await.unwrap();

        assert!(!user_dir.join("2024/7/a.jpg").exists());
        assert!(user_dir.join("Trash/2024/7/a.jpg").exists());
        assert!(user_dir.join("Trash/Thumbnails/2024/7/a.jpg").exists());
        assert!(user_dir.join("Trash/Metadata/2024/7/a.jpg.json").exists());
    }

    #[tokio::test]
    async fn move_to_trash_rejects_traversal_and_trash_prefixed_paths() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path();
        write(&user_dir.join("2024/7/a.jpg"), b"orig").await;

        move_to_trash(user_dir, "../etc/passwd").await.unwrap();
        move_to_trash(user_dir, "Trash/2024/7/a.jpg").await.unwrap();

        assert!(user_dir.join("2024/7/a.jpg").exists());
        assert!(!user_dir.join("Trash").exists());
    }

    #[tokio::test]
    async fn round_trip_restores_byte_identical_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path();
        write(&user_dir.join("2024/7/a.jpg"), b"orig-bytes").await;
        write(&user_dir.join("Thumbnails/2024/7/a.jpg"), b"thumb-bytes").await;
        write(&user_dir.join("Metadata/2024/7/a.jpg.json"), b"{}").await;

        move_to_trash(user_dir, "2024/7/a.jpg").await.unwrap();
        restore_from_trash(user_dir, "2024/7/a.jpg").await.unwrap();

        assert_eq!(
            tokio::fs::read(user_dir.join("2024/7/a.jpg")).await.unwrap(),
            b"orig-bytes"
        );
        assert_eq!(
            tokio::fs::read(user_dir.join("Thumbnails/2024/7/a.jpg"))
                .await
                .unwrap(),
            b"thumb-bytes"
        );
        assert!(!user_dir.join("Trash").exists() || {
            // Trash dir may remain if empty subdirs weren't cleaned up; what
            // matters is the file itself is gone.
            !user_dir.join("Trash/2024/7/a.jpg").exists()
        });
    }

    #[tokio::test]
    async fn move_to_trash_carries_video_thumbnail_with_jpeg_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path();
        write(&user_dir.join("2024/7/clip.mp4"), b"orig").await;
        write(&user_dir.join("Thumbnails/2024/7/clip.mp4.jpeg"), b"thumb").await;

        move_to_trash(user_dir, "2024/7/clip.mp4").await.unwrap();
        assert!(user_dir.join("Trash/Thumbnails/2024/7/clip.mp4.jpeg").exists());

        restore_from_trash(user_dir, "2024/7/clip.mp4").await.unwrap();
        assert!(user_dir.join("Thumbnails/2024/7/clip.mp4.jpeg").exists());
    }

    #[tokio::test]
    async fn empty_trash_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path();
        write(&user_dir.join("Trash/2024/7/a.jpg"), b"x").await;

        empty_trash(user_dir).await.unwrap();
        assert!(!user_dir.join("Trash").exists());

        empty_trash(user_dir).await.unwrap();
        assert!(!user_dir.join("Trash").exists());
    }

    #[tokio::test]
    async fn list_trash_files_excludes_sidecar_trees() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path();
        write(&user_dir.join("Trash/2024/7/a.jpg"), b"x").await;
        write(&user_dir.join("Trash/Thumbnails/2024/7/a.jpg"), b"x").await;
        write(&user_dir.join("Trash/Metadata/2024/7/a.jpg.json"), b"{}").await;

        let files = list_trash_files(user_dir).await.unwrap();
        assert_eq!(files, vec!["Trash/2024/7/a.jpg".to_string()]);
    }
}

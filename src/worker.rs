//! Media worker job queue (§4.2, §5): a bounded channel plus a fixed pool
//! of workers, each running metadata → thumbnail → classify-and-maybe-trash
//! strictly in order for the job it's handling.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::error::AppResult;
use crate::media::classifier::DocumentClassifier;
use crate::media::frame::FrameExtractor;
use crate::media::metadata::MetadataExtractor;
use crate::media::{self, MediaKind};
use crate::paths;
use crate::storage::StorageRoot;
use crate::trash;

/// One enqueued background job, produced by the upload pipeline (§4.1
/// step 7).
#[derive(Debug, Clone)]
pub struct MediaJob {
    pub user_id: String,
    pub device_id: String,
    pub rel_path: String,
    pub media_kind: MediaKind,
    pub saved_to_trash: bool,
}

/// Collaborators a worker needs to run a job's three phases. Cloned cheaply
/// (everything inside is an `Arc`) and shared across the worker pool.
#[derive(Clone)]
pub struct WorkerDeps {
    pub storage: StorageRoot,
    pub metadata_extractor: Arc<dyn MetadataExtractor>,
    pub frame_extractor: Arc<dyn FrameExtractor>,
    pub classifier: Option<Arc<dyn DocumentClassifier>>,
    pub document_to_trash: bool,
}

/// Spawns `worker_count` tasks sharing one `Receiver` behind a
/// `tokio::sync::Mutex` — the standard "N workers over one mpsc receiver"
/// pattern — and returns the bounded `Sender` the upload handler enqueues
/// onto.
pub fn spawn_pool(deps: WorkerDeps, capacity: usize, worker_count: usize) -> mpsc::Sender<MediaJob> {
    let (tx, rx) = mpsc::channel::<MediaJob>(capacity);
    let rx = Arc::new(Mutex::new(rx));

    for worker_id in 0..worker_count.max(1) {
        let rx = rx.clone();
        let deps = deps.clone();
        tokio::spawn(async move {
            loop {
                let job = {
                    let mut rx = rx.lock().await;
                    rx.recv().await
                };
                let Some(job) = job else {
                    tracing::info!(worker_id, "worker shutting down: channel closed");
                    break;
                };
                let rel = job.rel_path.clone();
                if let Err(e) = run_job(&deps, job).await {
                    tracing::error!(worker_id, rel, error = %e, "media job failed");
                }
            }
        });
    }

    tx
}

/// Runs a single job's three phases in order (§4.2).
async fn run_job(deps: &WorkerDeps, job: MediaJob) -> AppResult<()> {
    let user_dir = deps.storage.device_dir(&job.user_id, &job.device_id);
    let rel = if job.saved_to_trash {
        format!("{}/{}", paths::TRASH, job.rel_path)
    } else {
        job.rel_path.clone()
    };

    extract_metadata_phase(deps, &user_dir, &rel).await;
    build_thumbnail_phase(deps, &user_dir, &rel, job.media_kind).await;

    if job.media_kind == MediaKind::Image && deps.document_to_trash && !job.saved_to_trash {
        classify_and_maybe_trash_phase(deps, &user_dir, &rel).await?;
    }

    Ok(())
}

/// Phase 1: extract metadata into `meta(P)`. Failure is logged, never
/// aborts the job.
pub async fn extract_metadata_phase(deps: &WorkerDeps, user_dir: &std::path::Path, rel: &str) {
    let original = user_dir.join(rel);
    match deps.metadata_extractor.extract(&original).await {
        Ok(bytes) => {
            let meta_path = paths::metadata_path(user_dir, rel);
            if let Some(parent) = meta_path.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    tracing::warn!(rel, error = %e, "failed to create metadata directory");
                    return;
                }
            }
            if let Err(e) = tokio::fs::write(&meta_path, &bytes).await {
                tracing::warn!(rel, error = %e, "failed to write metadata sidecar");
            }
        }
        Err(e) => tracing::warn!(rel, error = %e, "metadata extraction failed"),
    }
}

/// Phase 2: build the thumbnail sidecar. Audio gets no thumbnail. Failure
/// is logged, never aborts the job.
pub async fn build_thumbnail_phase(
    deps: &WorkerDeps,
    user_dir: &std::path::Path,
    rel: &str,
    kind: MediaKind,
) {
    let original = user_dir.join(rel);
    let thumb_bytes = match kind {
        MediaKind::Image => {
            let Ok(data) = tokio::fs::read(&original).await else {
                tracing::warn!(rel, "thumbnail source file missing");
                return;
            };
            let orientation = orientation_for(deps, user_dir, rel).await;
            match media::thumbnail::build_image_thumbnail(&data, orientation) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(rel, error = %e, "image thumbnail build failed");
                    return;
                }
            }
        }
        MediaKind::Video => {
            let frame = match deps.frame_extractor.extract_frame(&original, 5).await {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(rel, error = %e, "video frame extraction failed");
                    return;
                }
            };
            match media::thumbnail::build_video_thumbnail(&frame) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(rel, error = %e, "video thumbnail build failed");
                    return;
                }
            }
        }
        MediaKind::Audio | MediaKind::Unknown => return,
    };

    let thumb_path = paths::thumbnail_base_path(user_dir, &format!("{rel}{}", media::thumb_ext(kind)));
    if let Some(parent) = thumb_path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            tracing::warn!(rel, error = %e, "failed to create thumbnail directory");
            return;
        }
    }
    if let Err(e) = tokio::fs::write(&thumb_path, &thumb_bytes).await {
        tracing::warn!(rel, error = %e, "failed to write thumbnail sidecar");
    }
}

/// Phase 3: classify (external tool if configured, else the built-in
/// heuristic) and move to Trash on a positive match.
pub async fn classify_and_maybe_trash_phase(
    deps: &WorkerDeps,
    user_dir: &std::path::Path,
    rel: &str,
) -> AppResult<()> {
    let original = user_dir.join(rel);

    let is_document = if let Some(classifier) = &deps.classifier {
        classifier.classify(&original).await.unwrap_or_else(|e| {
            tracing::warn!(rel = %rel, error = %e, "external classifier failed");
            false
        })
    } else {
        let Ok(data) = tokio::fs::read(&original).await else {
            return Ok(());
        };
        media::classifier::looks_like_document(&data).unwrap_or(false)
    };

    if is_document {
        trash::move_to_trash(user_dir, rel).await?;
    }
    Ok(())
}

async fn orientation_for(deps: &WorkerDeps, user_dir: &std::path::Path, rel: &str) -> u32 {
    let _ = deps;
    let meta_path = paths::metadata_path(user_dir, rel);
    crate::render::orientation_of(&meta_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::classifier::FakeClassifier;
    use crate::media::frame::FakeFrameExtractor;
    use crate::media::metadata::FakeExtractor;
    use crate::storage::StorageRoot;
    use std::sync::Arc;

    fn sample_jpeg() -> Vec<u8> {
        use image::{ImageBuffer, Rgb};
        let img = ImageBuffer::from_fn(64, 48, |_, _| Rgb([100u8, 100, 100]));
        let dynamic = image::DynamicImage::ImageRgb8(img);
        let mut buf = std::io::Cursor::new(Vec::new());
        dynamic.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    async fn write(path: &std::path::Path, data: &[u8]) {
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, data).await.unwrap();
    }

    /// Spec §8 scenario 1: a valid image upload gets a thumbnail and
    /// metadata sidecar after the job runs, and stays in the live realm.
    #[tokio::test]
    async fn job_produces_thumbnail_and_metadata_for_a_live_image() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageRoot::new(dir.path());
        let user_dir = storage.device_dir("alice", "phone1");
        write(&user_dir.join("2024/7/p.jpg"), &sample_jpeg()).await;

        let deps = WorkerDeps {
            storage: storage.clone(),
            metadata_extractor: Arc::new(FakeExtractor::with_orientation(1)),
            frame_extractor: Arc::new(FakeFrameExtractor { frame: vec![] }),
            classifier: None,
            document_to_trash: true,
        };

        let job = MediaJob {
            user_id: "alice".into(),
            device_id: "phone1".into(),
            rel_path: "2024/7/p.jpg".into(),
            media_kind: MediaKind::Image,
            saved_to_trash: false,
        };

        run_job(&deps, job).await.unwrap();

        assert!(user_dir.join("2024/7/p.jpg").exists());
        assert!(user_dir.join("Thumbnails/2024/7/p.jpg").exists());
        assert!(user_dir.join("Metadata/2024/7/p.jpg.json").exists());
    }

    /// A video's thumbnail is written with the `.jpeg` suffix its relative
    /// path doesn't already carry, so it doesn't collide with a live
    /// directory entry of the original's own name.
    #[tokio::test]
    async fn video_thumbnail_gets_jpeg_suffix_appended() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageRoot::new(dir.path());
        let user_dir = storage.device_dir("alice", "phone1");
        write(&user_dir.join("2024/7/clip.mp4"), b"not a real video").await;

        let deps = WorkerDeps {
            storage: storage.clone(),
            metadata_extractor: Arc::new(FakeExtractor::with_orientation(1)),
            frame_extractor: Arc::new(FakeFrameExtractor { frame: sample_jpeg() }),
            classifier: None,
            document_to_trash: true,
        };

        build_thumbnail_phase(&deps, &user_dir, "2024/7/clip.mp4", MediaKind::Video).await;

        assert!(user_dir.join("Thumbnails/2024/7/clip.mp4.jpeg").exists());
        assert!(!user_dir.join("Thumbnails/2024/7/clip.mp4").exists());
    }

    /// Spec §8 scenario 2: a file uploaded with `X-Save-To-Trash` skips
    /// document classification even when it's enabled, but still gets
    /// sidecars built in place under Trash.
    #[tokio::test]
    async fn job_skips_classification_for_files_saved_directly_to_trash() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageRoot::new(dir.path());
        let user_dir = storage.device_dir("alice", "phone1");
        write(&user_dir.join("Trash/2024/7/screenshot.png"), &sample_jpeg()).await;

        let classifier: Arc<dyn crate::media::classifier::DocumentClassifier> =
            Arc::new(FakeClassifier { result: true });
        let deps = WorkerDeps {
            storage: storage.clone(),
            metadata_extractor: Arc::new(FakeExtractor::with_orientation(1)),
            frame_extractor: Arc::new(FakeFrameExtractor { frame: vec![] }),
            classifier: Some(classifier),
            document_to_trash: true,
        };

        let job = MediaJob {
            user_id: "alice".into(),
            device_id: "phone1".into(),
            rel_path: "2024/7/screenshot.png".into(),
            media_kind: MediaKind::Image,
            saved_to_trash: true,
        };

        run_job(&deps, job).await.unwrap();

        assert!(user_dir.join("Trash/2024/7/screenshot.png").exists());
        assert!(user_dir.join("Trash/Thumbnails/2024/7/screenshot.png").exists());
        assert!(!user_dir.join("2024/7/screenshot.png").exists());
    }

    /// Spec §8 scenario 3: a blank-white image with document detection
    /// enabled ends up in Trash, sidecars included, after the job runs.
    #[tokio::test]
    async fn job_moves_classified_document_to_trash_with_sidecars() {
        use image::{ImageBuffer, Rgb};
        let blank_white = {
            let img = ImageBuffer::from_fn(400, 600, |_, _| Rgb([255u8, 255, 255]));
            let dynamic = image::DynamicImage::ImageRgb8(img);
            let mut buf = std::io::Cursor::new(Vec::new());
            dynamic.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
            buf.into_inner()
        };

        let dir = tempfile::tempdir().unwrap();
        let storage = StorageRoot::new(dir.path());
        let user_dir = storage.device_dir("alice", "phone1");
        write(&user_dir.join("2024/7/scan.jpg"), &blank_white).await;

        let deps = WorkerDeps {
            storage: storage.clone(),
            metadata_extractor: Arc::new(FakeExtractor::with_orientation(1)),
            frame_extractor: Arc::new(FakeFrameExtractor { frame: vec![] }),
            classifier: None,
            document_to_trash: true,
        };

        let job = MediaJob {
            user_id: "alice".into(),
            device_id: "phone1".into(),
            rel_path: "2024/7/scan.jpg".into(),
            media_kind: MediaKind::Image,
            saved_to_trash: false,
        };

        run_job(&deps, job).await.unwrap();

        assert!(!user_dir.join("2024/7/scan.jpg").exists());
        assert!(user_dir.join("Trash/2024/7/scan.jpg").exists());
        assert!(user_dir.join("Trash/Thumbnails/2024/7/scan.jpg").exists());
    }
}

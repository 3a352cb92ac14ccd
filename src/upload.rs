//! Upload pipeline (§4.1): streaming multipart ingest, size cap, type
//! sniff, date folder clamp, placement, and job enqueue.

use std::path::PathBuf;

use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Sender;

use crate::auth::store::AuthStore;
use crate::error::{AppError, AppResult};
use crate::media::{self, MediaKind};
use crate::paths;
use crate::storage::StorageRoot;
use crate::worker::MediaJob;

/// Hard cap on a single upload's bytes, per §4.1 step 1.
const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024 * 1024;
const SNIFF_WINDOW: usize = 512;

/// Inputs parsed from the request before any filesystem work begins.
pub struct UploadRequest {
    pub user: String,
    pub date: String,
    pub save_to_trash: bool,
}

/// Takes only the last path segment of a client-supplied filename or device
/// id, then strips path separators, reserved characters, and control
/// characters, per §4.1. Taking the last segment first is what keeps a
/// traversal attempt like `../etc/passwd` from surviving as `..etcpasswd`.
pub fn sanitize_component(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let filtered: String = base
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'..='\u{1f}' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let mut result = filtered.trim().to_string();
    while result.contains("..") {
        result = result.replace("..", ".");
    }
    result
}

/// Streams one multipart field to disk under `storage`, sniffing its kind
/// from the first 512 bytes, enforcing the 5 GiB cap, and enqueuing a
/// background job on success.
///
/// Returns `Ok(())` once the file is durably on disk and the job is
/// enqueued — the caller's HTTP response does not wait on the job itself.
pub async fn ingest(
    storage: &StorageRoot,
    auth_store: Option<&AuthStore>,
    job_tx: &Sender<MediaJob>,
    req: UploadRequest,
    device_id_raw: &str,
    filename_raw: &str,
    mut field: Field<'_>,
) -> AppResult<()> {
    if req.user.is_empty() {
        return Err(AppError::BadRequest("missing user".into()));
    }

    let Some((year, month)) = paths::parse_and_clamp_date(&req.date) else {
        return Err(AppError::BadRequest("bad date".into()));
    };

    let device_id = sanitize_component(device_id_raw);
    let filename = sanitize_component(filename_raw);
    if filename.is_empty() {
        return Err(AppError::BadRequest("missing filename".into()));
    }

    let resolved = crate::auth::resolve(auth_store, &req.user).await;
    let user_id = if resolved.is_empty() { req.user.clone() } else { resolved };

    let mut sniff_buf: Vec<u8> = Vec::with_capacity(SNIFF_WINDOW);
    while sniff_buf.len() < SNIFF_WINDOW {
        match field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            Some(chunk) => sniff_buf.extend_from_slice(&chunk),
            None => break,
        }
    }

    let kind = media::sniff(&sniff_buf);
    if kind == MediaKind::Unknown {
        return Err(AppError::BadRequest("invalid type".into()));
    }

    let mut rel = format!("{year}/{month}/{filename}");
    if req.save_to_trash {
        rel = format!("{}/{rel}", paths::TRASH);
    }

    let dest: PathBuf = storage.device_dir(&user_id, &device_id).join(&rel);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(&dest).await?;
    let mut written: u64 = 0;

    if let Err(e) = write_and_cap(&mut file, &sniff_buf, &mut written).await {
        drop(file);
        let _ = tokio::fs::remove_file(&dest).await;
        return Err(e);
    }

    loop {
        let chunk = match field.chunk().await {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(AppError::BadRequest(e.to_string()));
            }
        };
        let Some(chunk) = chunk else { break };
        if let Err(e) = write_and_cap(&mut file, &chunk, &mut written).await {
            drop(file);
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e);
        }
    }

    file.flush().await?;
    drop(file);

    let job = MediaJob {
        user_id,
        device_id,
        rel_path: format!("{year}/{month}/{filename}"),
        media_kind: kind,
        saved_to_trash: req.save_to_trash,
    };

    job_tx
        .send(job)
        .await
        .map_err(|_| AppError::Internal("media worker queue closed".into()))?;

    Ok(())
}

async fn write_and_cap(
    file: &mut tokio::fs::File,
    chunk: &[u8],
    written: &mut u64,
) -> AppResult<()> {
    *written += chunk.len() as u64;
    if *written > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest("size exceeded".into()));
    }
    file.write_all(chunk).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators_and_reserved_chars() {
        assert_eq!(sanitize_component("../etc/passwd"), "passwd");
        assert_eq!(sanitize_component("a:b*c?d"), "abcd");
        assert_eq!(sanitize_component("normal-name_1.jpg"), "normal-name_1.jpg");
    }
}

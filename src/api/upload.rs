//! `POST /upload` (§4.1, §6): parses the `user`/`date`/`X-Save-To-Trash`
//! headers and the single multipart field, then hands off to [`crate::upload::ingest`].

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};

use crate::error::{AppError, AppResult};
use crate::upload::{self, UploadRequest};
use crate::AppState;

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<StatusCode> {
    let user = header_str(&headers, "user").unwrap_or_default();
    let date = header_str(&headers, "date").unwrap_or_default();
    let save_to_trash = header_str(&headers, "x-save-to-trash")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
        .ok_or_else(|| AppError::BadRequest("missing multipart field".into()))?;

    let device_id_raw = field.name().unwrap_or("").to_string();
    let filename_raw = field.file_name().unwrap_or("").to_string();

    let req = UploadRequest { user, date, save_to_trash };

    upload::ingest(
        &state.storage,
        state.auth_store.as_ref(),
        &state.job_tx,
        req,
        &device_id_raw,
        &filename_raw,
        field,
    )
    .await?;

    Ok(StatusCode::OK)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_string)
}

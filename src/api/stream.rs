//! `GET /stream` (§4.7, §6): Range-aware serving of originals.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::Response;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::paths;
use crate::stream;
use crate::AppState;

use super::common::resolve_user_id;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "DeviceId")]
    pub device_id: String,
    #[serde(rename = "File")]
    pub file: String,
}

pub async fn handle(
    State(state): State<AppState>,
    Query(q): Query<StreamQuery>,
    headers: axum::http::HeaderMap,
) -> AppResult<Response> {
    if q.user.is_empty() || q.device_id.is_empty() || q.file.is_empty() {
        return Err(AppError::BadRequest("missing query parameter".into()));
    }
    if !paths::is_safe_relative(&q.file) {
        return Err(AppError::BadRequest("invalid file path".into()));
    }

    let user_id = resolve_user_id(&state, &q.user).await;
    let user_dir = state.storage.device_dir(&user_id, &q.device_id);
    let path = user_dir.join(&q.file);

    let content_type = stream::content_type_of(&path).await;
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    stream::serve_file(&path, &content_type, range_header).await
}

//! `POST /img` (§4.5, §6): renders an original at one of three qualities.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::paths;
use crate::render::{self, Quality};
use crate::AppState;

use super::common::{resolve_user_id, UserData};

#[derive(Debug, Deserialize)]
pub struct ImgRequest {
    #[serde(rename = "UserData")]
    pub user_data: UserData,
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Quality")]
    pub quality: Quality,
}

pub async fn handle(
    State(state): State<AppState>,
    Json(req): Json<ImgRequest>,
) -> AppResult<Response> {
    if !paths::is_safe_relative(&req.file) {
        return Err(AppError::BadRequest("invalid file path".into()));
    }

    let user_id = resolve_user_id(&state, &req.user_data.user).await;
    let user_dir = state.storage.device_dir(&user_id, &req.user_data.device_id);
    let original = user_dir.join(&req.file);

    let rendered = match req.quality {
        Quality::Full => render::render_full(&original).await?,
        Quality::High => {
            let thumb_bytes = read_thumb(&user_dir, &req.file).await?;
            let meta_path = paths::metadata_path(&user_dir, &req.file);
            let orientation = render::orientation_of(&meta_path).await;
            render::render_high(&thumb_bytes, orientation)?
        }
        Quality::Thumbnail => {
            let thumb_bytes = read_thumb(&user_dir, &req.file).await?;
            render::render_thumbnail(&thumb_bytes)?
        }
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, rendered.content_type)
        .body(Body::from(rendered.bytes))
        .map_err(|e| AppError::Internal(e.to_string()))?
        .into_response())
}

async fn read_thumb(user_dir: &std::path::Path, file: &str) -> AppResult<Vec<u8>> {
    let suffixed = format!("{file}{}", paths::thumb_ext_for_file(file));
    let thumb_path = paths::thumbnail_base_path(user_dir, &suffixed);
    tokio::fs::read(&thumb_path).await.map_err(|_| AppError::NotFound)
}

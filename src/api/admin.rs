//! `POST /regenerate-thumbnails`, `POST /clean-orphan-thumbnails`,
//! `POST /run-document-detection` (§4.9, §6).

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::admin::{self, CleanOrphansResult, DocumentDetectionResult, RegenerateResult};
use crate::error::AppResult;
use crate::AppState;

use super::common::{resolve_user_id, UserData};

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    #[serde(rename = "UserData")]
    pub user_data: UserData,
}

pub async fn regenerate_thumbnails(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> AppResult<Json<RegenerateResult>> {
    let user_id = resolve_user_id(&state, &req.user_data.user).await;
    let lock = state.locks.get(&user_id, &req.user_data.device_id);
    let _guard = lock.lock().await;
    let user_dir = state.storage.device_dir(&user_id, &req.user_data.device_id);

    let result = admin::regenerate_thumbnails(&state.worker_deps, &user_dir).await?;
    Ok(Json(result))
}

pub async fn clean_orphan_thumbnails(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> AppResult<Json<CleanOrphansResult>> {
    let user_id = resolve_user_id(&state, &req.user_data.user).await;
    let lock = state.locks.get(&user_id, &req.user_data.device_id);
    let _guard = lock.lock().await;
    let user_dir = state.storage.device_dir(&user_id, &req.user_data.device_id);

    let result = admin::clean_orphan_thumbnails(&user_dir).await?;
    Ok(Json(result))
}

pub async fn run_document_detection(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> AppResult<Json<DocumentDetectionResult>> {
    let user_id = resolve_user_id(&state, &req.user_data.user).await;
    let lock = state.locks.get(&user_id, &req.user_data.device_id);
    let _guard = lock.lock().await;
    let user_dir = state.storage.device_dir(&user_id, &req.user_data.device_id);

    let result = admin::run_document_detection(&state.worker_deps, &user_dir).await?;
    Ok(Json(result))
}

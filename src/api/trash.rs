//! `POST /move-to-trash`, `POST /restore`, `POST /empty-trash` (§4.4, §6).

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::trash;
use crate::AppState;

use super::common::{resolve_user_id, UserData};

#[derive(Debug, Deserialize)]
pub struct FilesRequest {
    #[serde(rename = "UserData")]
    pub user_data: UserData,
    #[serde(rename = "Files")]
    pub files: Vec<String>,
}

pub async fn move_to_trash(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<FilesRequest>,
) -> AppResult<StatusCode> {
    let user_id = resolve_user_id(&state, &req.user_data.user).await;
    let lock = state.locks.get(&user_id, &req.user_data.device_id);
    let _guard = lock.lock().await;
    let user_dir = state.storage.device_dir(&user_id, &req.user_data.device_id);

    for rel in &req.files {
        trash::move_to_trash(&user_dir, rel).await?;
    }
    Ok(StatusCode::OK)
}

pub async fn restore(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<FilesRequest>,
) -> AppResult<StatusCode> {
    let user_id = resolve_user_id(&state, &req.user_data.user).await;
    let lock = state.locks.get(&user_id, &req.user_data.device_id);
    let _guard = lock.lock().await;
    let user_dir = state.storage.device_dir(&user_id, &req.user_data.device_id);

    for trash_rel in &req.files {
        let stripped = trash_rel
            .strip_prefix("Trash/")
            .unwrap_or(trash_rel);
        trash::restore_from_trash(&user_dir, stripped).await?;
    }
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct EmptyTrashRequest {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "DeviceId")]
    pub device_id: String,
    #[serde(rename = "Password")]
    pub password: Option<String>,
}

/// Protected per §7(2): requires a configured auth store and a valid
/// `{User, Password}` pair.
pub async fn empty_trash(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<EmptyTrashRequest>,
) -> AppResult<StatusCode> {
    let store = state.auth_store.as_ref().ok_or(AppError::Unauthorized)?;
    let password = req.password.as_deref().unwrap_or("");
    if !store.verify_credentials(&req.user, password).await {
        return Err(AppError::Unauthorized);
    }

    let user_id = resolve_user_id(&state, &req.user).await;
    let lock = state.locks.get(&user_id, &req.device_id);
    let _guard = lock.lock().await;
    let user_dir = state.storage.device_dir(&user_id, &req.device_id);

    trash::empty_trash(&user_dir).await?;
    Ok(StatusCode::OK)
}

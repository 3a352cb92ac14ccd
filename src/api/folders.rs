//! `POST /folders` (§4.8, §6).

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::listing;
use crate::AppState;

use super::common::resolve_user_id;

#[derive(Debug, Deserialize)]
pub struct FoldersRequest {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "DeviceId")]
    pub device_id: String,
}

pub async fn handle(
    State(state): State<AppState>,
    Json(req): Json<FoldersRequest>,
) -> AppResult<Json<Vec<listing::YearFolders>>> {
    let user_id = resolve_user_id(&state, &req.user).await;
    let user_dir = state.storage.device_dir(&user_id, &req.device_id);
    let folders = listing::get_folders(&user_dir).await?;
    Ok(Json(folders))
}

//! `POST /files` (§4.8, §6).

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::listing;
use crate::AppState;

use super::common::{resolve_user_id, UserData};

#[derive(Debug, Deserialize)]
pub struct FilesRequest {
    #[serde(rename = "UserData")]
    pub user_data: UserData,
    #[serde(rename = "Folder")]
    pub folder: String,
}

pub async fn handle(
    State(state): State<AppState>,
    Json(req): Json<FilesRequest>,
) -> AppResult<Json<Vec<String>>> {
    let user_id = resolve_user_id(&state, &req.user_data.user).await;
    let files = listing::get_files(&state.storage, &user_id, &req.user_data.device_id, &req.folder).await?;
    Ok(Json(files))
}

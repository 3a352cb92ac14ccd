//! `POST /auth/login`, `POST /auth/register` (§6) — thin delegation to the
//! local auth collaborator. Disabled (`501`) when no store is configured.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Password")]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "UserId")]
    pub user_id: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> AppResult<Response> {
    let Some(store) = state.auth_store.as_ref() else {
        return Ok(StatusCode::NOT_IMPLEMENTED.into_response());
    };

    if req.user.is_empty() || req.password.is_empty() {
        return Err(AppError::Unauthorized);
    }
    if !store.verify_credentials(&req.user, &req.password).await {
        return Err(AppError::Unauthorized);
    }
    let token = store
        .issue_token(&req.user)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let user_id = store
        .user_id_for_username(&req.user)
        .await
        .unwrap_or_default();

    Ok(Json(TokenResponse { token, user_id }).into_response())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> AppResult<Response> {
    let Some(store) = state.auth_store.as_ref() else {
        return Ok(StatusCode::NOT_IMPLEMENTED.into_response());
    };

    if req.user.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("missing user or password".into()));
    }

    let user_id = store.create_user(&req.user, &req.password).await?;
    let token = store.issue_token(&req.user).await?.unwrap_or_default();

    Ok(Json(TokenResponse { token, user_id }).into_response())
}

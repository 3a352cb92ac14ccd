//! Wire types shared across handlers (§6).

use serde::Deserialize;

/// The `{User, DeviceId}` pair nearly every endpoint accepts, nested as
/// `UserData` in most request bodies.
#[derive(Debug, Deserialize)]
pub struct UserData {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "DeviceId")]
    pub device_id: String,
}

/// Resolves `UserData.User` to a storage identifier, falling back to the
/// literal (lowercased) value when no auth store is configured.
pub async fn resolve_user_id(state: &crate::AppState, user: &str) -> String {
    let resolved = crate::auth::resolve(state.auth_store.as_ref(), user).await;
    if resolved.is_empty() {
        user.to_lowercase()
    } else {
        resolved
    }
}

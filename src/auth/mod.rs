//! Identity resolution — the one place a caller-supplied identity touches
//! the storage tree (§4.3).
//!
//! The real credential/session product (registration UI, password resets,
//! OAuth2, …) is an external collaborator this system does not implement.
//! What lives here is the minimal face the spec actually needs: a
//! `resolve()` function, and just enough of a local store to exercise it
//! and to gate `/empty-trash`.

pub mod store;

use store::AuthStore;

/// Maps a caller-supplied user token/email to the storage identifier that
/// forms the first path segment under the storage root.
///
/// * If an auth store is configured and `user` is a known user id, returns
///   the lowercased username (email) registered for that id.
/// * Otherwise returns `lowercase(user)`.
/// * Empty input returns empty, never a default identity.
pub async fn resolve(store: Option<&AuthStore>, user: &str) -> String {
    if user.is_empty() {
        return String::new();
    }
    if let Some(store) = store {
        if let Some(username) = store.username_for_user_id(user).await {
            return username.to_lowercase();
        }
    }
    user.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_user_resolves_to_empty() {
        assert_eq!(resolve(None, "").await, "");
    }

    #[tokio::test]
    async fn unconfigured_store_lowercases_literally() {
        assert_eq!(resolve(None, "Alice@Example.com").await, "alice@example.com");
    }

    #[tokio::test]
    async fn known_user_id_resolves_to_registered_username() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.db").to_str().unwrap(), "pepper")
            .await
            .unwrap();
        let id = store.create_user("Alice@Example.com", "hunter2").await.unwrap();
        assert_eq!(resolve(Some(&store), &id).await, "alice@example.com");
    }

    #[tokio::test]
    async fn unknown_id_falls_back_to_lowercased_literal() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.db").to_str().unwrap(), "pepper")
            .await
            .unwrap();
        assert_eq!(resolve(Some(&store), "NOBODY").await, "nobody");
    }
}

//! Minimal local credential + session store, SQLite-backed via `sqlx`.
//!
//! This is deliberately small: the real auth product is an external
//! collaborator (§1). What's here exists to give `resolve()` (§4.3)
//! something to resolve against, and to gate `/empty-trash`.

use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Clone)]
pub struct AuthStore {
    pool: SqlitePool,
    pepper: String,
}

impl AuthStore {
    /// Opens (creating if absent) the SQLite file at `path`, applying the
    /// schema. `pepper` is mixed into password hashes so a leaked database
    /// alone does not yield usable credentials.
    pub async fn open(path: &str, pepper: &str) -> AppResult<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connect_options = SqliteConnectOptions::from_str(path)
            .map_err(|e| AppError::Internal(format!("invalid auth db path: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            pepper: pepper.to_string(),
        })
    }

    fn hash_password(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.pepper.as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Creates a user with a fresh UUID id. If the username already exists,
    /// returns the existing id rather than erroring — idempotent bootstrap.
    pub async fn create_user(&self, username: &str, password: &str) -> AppResult<String> {
        if let Some(existing) = self.user_id_for_username(username).await {
            return Ok(existing);
        }
        let id = Uuid::new_v4().to_string();
        let hash = self.hash_password(password);
        sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(username)
            .bind(&hash)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    /// Bootstraps the first user from configured admin credentials if the
    /// table is empty. No-op if a user already exists or credentials are
    /// absent.
    pub async fn bootstrap_from_env(
        &self,
        admin_user: Option<&str>,
        admin_password: Option<&str>,
    ) -> AppResult<()> {
        let (Some(user), Some(password)) = (admin_user, admin_password) else {
            return Ok(());
        };
        if user.is_empty() || password.is_empty() {
            return Ok(());
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(());
        }
        self.create_user(user, password).await?;
        tracing::info!(user, "bootstrapped first auth user from environment");
        Ok(())
    }

    /// Returns the user id for a registered username, if any.
    pub async fn user_id_for_username(&self, username: &str) -> Option<String> {
        sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
    }

    /// Returns the registered username (email) for `user_id`, if it exists.
    pub async fn username_for_user_id(&self, user_id: &str) -> Option<String> {
        sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
    }

    /// Verifies a username/password pair against the stored hash.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> bool {
        let stored: Option<String> = sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten();
        match stored {
            Some(hash) => hash == self.hash_password(password),
            None => false,
        }
    }

    /// Issues a session token for `username`, valid for 7 days. Returns
    /// `None` if the username does not exist.
    pub async fn issue_token(&self, username: &str) -> AppResult<Option<String>> {
        let Some(user_id) = self.user_id_for_username(username).await else {
            return Ok(None);
        };
        let token = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at)
             VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%SZ', 'now', ? || ' seconds'))",
        )
        .bind(&token)
        .bind(&user_id)
        .bind(TOKEN_TTL_SECONDS.to_string())
        .execute(&self.pool)
        .await?;
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_verify_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.db").to_str().unwrap(), "pepper")
            .await
            .unwrap();
        store.create_user("bob@example.com", "swordfish").await.unwrap();
        assert!(store.verify_credentials("bob@example.com", "swordfish").await);
        assert!(!store.verify_credentials("bob@example.com", "wrong").await);
    }

    #[tokio::test]
    async fn create_user_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.db").to_str().unwrap(), "pepper")
            .await
            .unwrap();
        let id1 = store.create_user("bob@example.com", "a").await.unwrap();
        let id2 = store.create_user("bob@example.com", "b").await.unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn issue_token_requires_existing_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.db").to_str().unwrap(), "pepper")
            .await
            .unwrap();
        assert!(store.issue_token("ghost@example.com").await.unwrap().is_none());
        store.create_user("bob@example.com", "a").await.unwrap();
        assert!(store.issue_token("bob@example.com").await.unwrap().is_some());
    }
}

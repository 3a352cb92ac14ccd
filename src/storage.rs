//! On-disk layout invariants and safe filesystem primitives.
//!
//! Nothing in this module knows about media semantics — it only knows how
//! to create directories, move files without losing data, and clear a
//! read-only attribute before removal on platforms that require it. All
//! mutation of `R` is keyed by `(userId, deviceId)` via [`KeyedLocks`], per
//! the per-key exclusion design note.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;

/// Root of the storage tree (`R` in the spec).
#[derive(Debug, Clone)]
pub struct StorageRoot {
    root: PathBuf,
}

impl StorageRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Directory for a given `(userId, deviceId)` pair.
    pub fn device_dir(&self, user_id: &str, device_id: &str) -> PathBuf {
        self.root.join(user_id).join(device_id)
    }
}

/// Moves `src` to `dst`, creating `dst`'s parent directories as needed.
/// A missing `src` is not an error — the caller is expected to treat a
/// no-op move as "there was nothing to move", matching the best-effort
/// sidecar semantics used throughout the Trash manager.
pub async fn move_if_exists(src: &Path, dst: &Path) -> std::io::Result<bool> {
    if tokio::fs::metadata(src).await.is_err() {
        return Ok(false);
    }
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(src, dst).await?;
    Ok(true)
}

/// Recursively removes `dir`, clearing the read-only attribute on platforms
/// that forbid removing read-only entries before they are writable. A
/// missing `dir` is not an error.
pub async fn remove_dir_all_writable(dir: &Path) -> std::io::Result<()> {
    if tokio::fs::metadata(dir).await.is_err() {
        return Ok(());
    }
    clear_readonly_recursive(dir).await?;
    tokio::fs::remove_dir_all(dir).await
}

#[cfg(windows)]
async fn clear_readonly_recursive(dir: &Path) -> std::io::Result<()> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || clear_readonly_recursive_blocking(&dir))
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?
}

#[cfg(windows)]
fn clear_readonly_recursive_blocking(dir: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let mut perms = entry.metadata()?.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            std::fs::set_permissions(&path, perms)?;
        }
        if path.is_dir() {
            clear_readonly_recursive_blocking(&path)?;
        }
    }
    Ok(())
}

/// On non-Windows platforms `remove_dir_all` already handles read-only
/// files (the permission bit that matters there is the *directory's*
/// write bit, not a per-file read-only flag), so this is a no-op.
#[cfg(not(windows))]
async fn clear_readonly_recursive(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// A registry of per-key async mutexes, keyed by `(userId, deviceId)`.
///
/// Concurrent operations on disjoint keys proceed independently; operations
/// on the same key (e.g. two trash moves for the same device) serialize
/// through the same lock. Deliberately per-key rather than a single global
/// mutex, per the design note in §9.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<StdMutex<HashMap<(String, String), Arc<AsyncMutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `(user_id, device_id)`, creating it on first
    /// use. Acquire it with `.lock().await` to serialize against other
    /// operations on the same key.
    pub fn get(&self, user_id: &str, device_id: &str) -> Arc<AsyncMutex<()>> {
        let key = (user_id.to_string(), device_id.to_string());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

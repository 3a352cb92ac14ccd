//! Listing service (§4.8): folder and file enumeration across devices, with
//! the Trash virtual folder spliced in.

use std::path::Path;

use serde::Serialize;

use crate::error::AppResult;
use crate::paths;
use crate::storage::StorageRoot;
use crate::trash;

/// One year's worth of folders, as returned by `GetFolders`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct YearFolders {
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Months")]
    pub months: Vec<String>,
}

/// `GetFolders(user, deviceId)`: walks the device subtree for year
/// directories (length-4 names) and the month directories inside them,
/// skipping `Trash`, `Thumbnails`, `Metadata`.
pub async fn get_folders(user_dir: &Path) -> AppResult<Vec<YearFolders>> {
    let mut out = Vec::new();

    let Ok(mut years) = tokio::fs::read_dir(user_dir).await else {
        return Ok(out);
    };

    let mut year_entries = Vec::new();
    while let Some(entry) = years.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if paths::should_skip_in_folder_listing(&name) {
            continue;
        }
        if name.len() == 4 && name.chars().all(|c| c.is_ascii_digit()) {
            year_entries.push((name, entry.path()));
        }
    }
    year_entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (year, year_path) in year_entries {
        let mut months = Vec::new();
        let mut month_dirs = tokio::fs::read_dir(&year_path).await?;
        while let Some(entry) = month_dirs.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            months.push(format!("{year}/{name}"));
        }
        months.sort();
        out.push(YearFolders { year, months });
    }

    Ok(out)
}

/// `GetFiles(user, deviceId, folder)`: lists non-directory entries
/// immediately inside `deviceId/folder`. An empty `deviceId` enumerates
/// every device under the user and prefixes each path with `deviceId/`.
/// `folder == "Trash"` defers to [`trash::list_trash_files`].
pub async fn get_files(
    storage: &StorageRoot,
    user_id: &str,
    device_id: &str,
    folder: &str,
) -> AppResult<Vec<String>> {
    if device_id.is_empty() {
        return get_files_all_devices(storage, user_id, folder).await;
    }

    let user_dir = storage.device_dir(user_id, device_id);

    if folder == paths::TRASH {
        return trash::list_trash_files(&user_dir).await;
    }

    let dir = user_dir.join(folder);
    let mut out = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
        return Ok(out);
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        out.push(format!("{folder}/{name}"));
    }
    out.sort();
    Ok(out)
}

async fn get_files_all_devices(
    storage: &StorageRoot,
    user_id: &str,
    folder: &str,
) -> AppResult<Vec<String>> {
    let user_root = storage.path().join(user_id);
    let mut out = Vec::new();
    let Ok(mut devices) = tokio::fs::read_dir(&user_root).await else {
        return Ok(out);
    };
    let mut device_ids = Vec::new();
    while let Some(entry) = devices.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            device_ids.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    device_ids.sort();

    for device_id in device_ids {
        let files = Box::pin(get_files(storage, user_id, &device_id, folder)).await?;
        for file in files {
            out.push(format!("{device_id}/{file}"));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write(path: &Path, data: &[u8]) {
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, data).await.unwrap();
    }

    #[tokio::test]
    async fn get_folders_skips_sidecar_trees_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path();
        write(&user_dir.join("2024/7/a.jpg"), b"x").await;
        write(&user_dir.join("2023/1/b.jpg"), b"x").await;
        write(&user_dir.join("Thumbnails/2024/7/a.jpg"), b"x").await;

        let folders = get_folders(user_dir).await.unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].year, "2023");
        assert_eq!(folders[0].months, vec!["2023/1"]);
        assert_eq!(folders[1].year, "2024");
    }

    #[tokio::test]
    async fn get_files_lists_single_device_folder() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageRoot::new(dir.path());
        write(&dir.path().join("alice/phone1/2024/7/a.jpg"), b"x").await;
        write(&dir.path().join("alice/phone1/2024/7/b.jpg"), b"x").await;

        let files = get_files(&storage, "alice", "phone1", "2024/7").await.unwrap();
        assert_eq!(files, vec!["2024/7/a.jpg".to_string(), "2024/7/b.jpg".to_string()]);
    }

    #[tokio::test]
    async fn get_files_with_empty_device_aggregates_across_devices() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageRoot::new(dir.path());
        write(&dir.path().join("alice/phone1/2024/7/a.jpg"), b"x").await;
        write(&dir.path().join("alice/laptop/2024/7/b.jpg"), b"x").await;

        let files = get_files(&storage, "alice", "", "2024/7").await.unwrap();
        assert_eq!(
            files,
            vec!["laptop/2024/7/b.jpg".to_string(), "phone1/2024/7/a.jpg".to_string()]
        );
    }

    #[tokio::test]
    async fn get_files_for_trash_folder_uses_trash_listing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageRoot::new(dir.path());
        write(&dir.path().join("alice/phone1/Trash/2024/7/a.jpg"), b"x").await;

        let files = get_files(&storage, "alice", "phone1", "Trash").await.unwrap();
        assert_eq!(files, vec!["Trash/2024/7/a.jpg".to_string()]);
    }
}

//! services/api/src/adapters/local_storage.rs
//!
//! File-backed implementation of the `LocalStorage` port. Each guest device gets
//! one JSON file holding a flat string-to-string map, mirroring a browser's
//! local storage.
//!
//! File location: `{guest_storage_path}/{device_id}.json`

use async_trait::async_trait;
use mood_journal_core::ports::{LocalStorage, PortError, PortResult};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Hands out the local storage of individual devices.
///
/// Handles are cached so every caller touching one device shares a single
/// writer lock.
pub struct LocalStorageRoot {
    base: PathBuf,
    open: std::sync::Mutex<HashMap<Uuid, Arc<FileLocalStorage>>>,
}

impl LocalStorageRoot {
    pub fn new(base: PathBuf) -> Self {
        Self {
            base,
            open: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, device_id: Uuid) -> Arc<FileLocalStorage> {
        let mut open = self.open.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        open.entry(device_id)
            .or_insert_with(|| {
                Arc::new(FileLocalStorage::new(
                    self.base.join(format!("{}.json", device_id)),
                ))
            })
            .clone()
    }
}

/// One device's local storage.
///
/// Each call reads or rewrites the whole file under the handle's lock. Separate
/// processes sharing the same file are not coordinated.
pub struct FileLocalStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLocalStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> PortResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                PortError::Unexpected(format!(
                    "Failed to parse local storage {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PortError::Unexpected(format!(
                "Failed to read local storage: {}",
                e
            ))),
        }
    }

    async fn write_all(&self, items: &BTreeMap<String, String>) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(format!("Failed to create directory: {}", e)))?;
        }
        let serialized = serde_json::to_string_pretty(items)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::write(&self.path, serialized)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write local storage: {}", e)))
    }
}

#[async_trait]
impl LocalStorage for FileLocalStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items).await
    }

    async fn remove_item(&self, key: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorageRoot::new(temp_dir.path().to_path_buf()).open(Uuid::new_v4());
        assert_eq!(storage.get_item("guest_entries").await.unwrap(), None);
    }

    #[tokio::test]
    async fn items_persist_across_handles() {
        let temp_dir = TempDir::new().unwrap();
        let root = LocalStorageRoot::new(temp_dir.path().join("nested"));
        let device = Uuid::new_v4();

        root.open(device).set_item("diary_guest_mode", "true").await.unwrap();
        assert_eq!(
            root.open(device).get_item("diary_guest_mode").await.unwrap(),
            Some("true".to_string())
        );

        root.open(device).remove_item("diary_guest_mode").await.unwrap();
        assert_eq!(root.open(device).get_item("diary_guest_mode").await.unwrap(), None);
    }

    #[tokio::test]
    async fn devices_do_not_share_items() {
        let temp_dir = TempDir::new().unwrap();
        let root = LocalStorageRoot::new(temp_dir.path().to_path_buf());

        root.open(Uuid::new_v4()).set_item("k", "v").await.unwrap();
        assert_eq!(root.open(Uuid::new_v4()).get_item("k").await.unwrap(), None);
    }
}

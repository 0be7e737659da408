use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::ProgressCache;
use crate::models::ContentKey;

/// File-backed progress cache: a single JSON object mapping namespaced
/// content keys to seconds watched, written through on every store.
///
/// Entries whose owner never returns are left in place; they are tiny and
/// redundant with server state once synced.
pub struct FileProgressStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, f64>>,
}

impl FileProgressStore {
    /// Open the store at an explicit path, creating parent directories as
    /// needed. A missing or unreadable file starts the store empty rather
    /// than failing the session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create progress cache directory")?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Progress cache at {:?} is corrupt, starting empty: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        debug!("Opened progress cache at {:?} ({} entries)", path, entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Open the store at the platform data directory.
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_dir().context("Failed to determine data directory")?;
        Self::open(data_dir.join("coursetrack").join("progress.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, f64>) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents).context("Failed to write progress cache")?;
        Ok(())
    }
}

#[async_trait]
impl ProgressCache for FileProgressStore {
    async fn load(&self, key: &ContentKey) -> Result<Option<f64>> {
        Ok(self.entries.read().await.get(&key.storage_key()).copied())
    }

    async fn store(&self, key: &ContentKey, seconds: f64) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.storage_key(), seconds);
        self.flush(&entries)
    }

    async fn remove(&self, key: &ContentKey) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(&key.storage_key()).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key() -> ContentKey {
        ContentKey::new("c1", "m1", "v1")
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");

        {
            let store = FileProgressStore::open(&path).unwrap();
            store.store(&key(), 35.0).await.unwrap();
        }

        let store = FileProgressStore::open(&path).unwrap();
        assert_eq!(store.load(&key()).await.unwrap(), Some(35.0));
    }

    #[tokio::test]
    async fn remove_deletes_the_entry_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");

        let store = FileProgressStore::open(&path).unwrap();
        store.store(&key(), 35.0).await.unwrap();
        store.remove(&key()).await.unwrap();

        let store = FileProgressStore::open(&path).unwrap();
        assert_eq!(store.load(&key()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileProgressStore::open(&path).unwrap();
        assert_eq!(store.load(&key()).await.unwrap(), None);

        // And it is usable afterwards.
        store.store(&key(), 5.0).await.unwrap();
        assert_eq!(store.load(&key()).await.unwrap(), Some(5.0));
    }

    #[tokio::test]
    async fn entries_are_isolated_per_content() {
        let dir = TempDir::new().unwrap();
        let store = FileProgressStore::open(dir.path().join("p.json")).unwrap();

        let other = ContentKey::new("c1", "m1", "v2");
        store.store(&key(), 10.0).await.unwrap();
        store.store(&other, 20.0).await.unwrap();
        store.remove(&key()).await.unwrap();

        assert_eq!(store.load(&other).await.unwrap(), Some(20.0));
    }
}

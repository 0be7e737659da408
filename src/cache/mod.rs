pub mod file_store;

pub use file_store::FileProgressStore;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::ContentKey;

/// Durable client-side store of accumulated watch-time, one float per
/// content item.
///
/// This is a durability hedge against losing progress between server
/// syncs, not a security boundary: entries are written every sample tick
/// and deleted once the server acknowledges a sync.
#[async_trait]
pub trait ProgressCache: Send + Sync {
    async fn load(&self, key: &ContentKey) -> Result<Option<f64>>;
    async fn store(&self, key: &ContentKey, seconds: f64) -> Result<()>;
    async fn remove(&self, key: &ContentKey) -> Result<()>;
}

/// Non-durable cache for tests and embedders without local storage.
#[derive(Default)]
pub struct MemoryProgressStore {
    entries: RwLock<HashMap<String, f64>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressCache for MemoryProgressStore {
    async fn load(&self, key: &ContentKey) -> Result<Option<f64>> {
        Ok(self.entries.read().await.get(&key.storage_key()).copied())
    }

    async fn store(&self, key: &ContentKey, seconds: f64) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.storage_key(), seconds);
        Ok(())
    }

    async fn remove(&self, key: &ContentKey) -> Result<()> {
        self.entries.write().await.remove(&key.storage_key());
        Ok(())
    }
}

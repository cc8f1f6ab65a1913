//! Persistent key/value memory backed by a single JSON map.

use async_trait::async_trait;
use ember_core::error::StoreError;
use ember_core::memory::{KeyValueMemory, MemoryEntry};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;
use crate::store::JsonStore;

pub struct KvStore {
    store: JsonStore<BTreeMap<String, MemoryEntry>>,
}

impl KvStore {
    pub fn open(path: PathBuf) -> Self {
        Self {
            store: JsonStore::open(path, BTreeMap::new()),
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            store: JsonStore::ephemeral(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read(|m| m.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Keys in sorted order.
    pub async fn keys(&self) -> Vec<String> {
        self.store.read(|m| m.keys().cloned().collect()).await
    }
}

#[async_trait]
impl KeyValueMemory for KvStore {
    async fn remember(&self, entry: MemoryEntry) -> Result<(), StoreError> {
        debug!(key = %entry.key, origin = ?entry.origin, "Remembering");
        self.store
            .update(|m| {
                m.insert(entry.key.clone(), entry);
            })
            .await
    }

    async fn recall(&self, key: &str) -> Result<Option<MemoryEntry>, StoreError> {
        Ok(self.store.read(|m| m.get(key).cloned()).await)
    }

    async fn entries(&self) -> Result<BTreeMap<String, MemoryEntry>, StoreError> {
        Ok(self.store.snapshot().await)
    }
}

//! Persistent memory records and the key/value seam.
//!
//! Storage lives in `ember-memory`; this module only defines the records and
//! the trait the session uses to spill evicted short-term context.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::StoreError;

/// Reserved key that makes `recall` return the whole map.
pub const RECALL_ALL_KEY: &str = "all";

/// Where a key/value entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOrigin {
    /// Written by an explicit `remember` call
    Explicit,
    /// Written when the short-term buffer evicted its oldest half
    AutoSummary,
}

/// A single persistent key/value entry. Overwritten on key reuse, never
/// deleted automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub value: String,
    pub saved_at: DateTime<Utc>,
    pub origin: MemoryOrigin,
}

impl MemoryEntry {
    pub fn explicit(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            saved_at: Utc::now(),
            origin: MemoryOrigin::Explicit,
        }
    }

    pub fn auto_summary(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            saved_at: Utc::now(),
            origin: MemoryOrigin::AutoSummary,
        }
    }
}

/// One entry in the long-term keyword archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub id: String,

    /// "conversation", "note", or "archive" for compacted aggregates
    #[serde(rename = "type")]
    pub kind: String,

    /// At most 500 characters
    pub content: String,

    pub keywords: Vec<String>,

    pub created_at: DateTime<Utc>,
}

/// Persistent key/value memory.
///
/// Implementations must make each call atomic with respect to the others:
/// a `remember` racing a `entries` never exposes a half-written map.
#[async_trait]
pub trait KeyValueMemory: Send + Sync {
    /// Insert or overwrite an entry.
    async fn remember(&self, entry: MemoryEntry) -> Result<(), StoreError>;

    async fn recall(&self, key: &str) -> Result<Option<MemoryEntry>, StoreError>;

    /// Snapshot of the whole map.
    async fn entries(&self) -> Result<BTreeMap<String, MemoryEntry>, StoreError>;
}

/// Render a recall request the way tools and the CLI show it: the reserved
/// `all` key dumps the map as JSON, a missing key yields a not-found line.
pub async fn recall_text(memory: &dyn KeyValueMemory, key: &str) -> Result<String, StoreError> {
    if key == RECALL_ALL_KEY {
        let entries = memory.entries().await?;
        let map: BTreeMap<&str, &str> = entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.value.as_str()))
            .collect();
        return serde_json::to_string_pretty(&map).map_err(|e| StoreError::Serialize {
            what: "memory map".into(),
            reason: e.to_string(),
        });
    }

    Ok(match memory.recall(key).await? {
        Some(entry) => entry.value,
        None => format!("No memory found for key: {key}"),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tokio::sync::Mutex;

    /// Map-backed memory for unit tests in this crate.
    #[derive(Default)]
    pub struct MapMemory {
        pub entries: Mutex<BTreeMap<String, MemoryEntry>>,
    }

    #[async_trait]
    impl KeyValueMemory for MapMemory {
        async fn remember(&self, entry: MemoryEntry) -> Result<(), StoreError> {
            self.entries.lock().await.insert(entry.key.clone(), entry);
            Ok(())
        }

        async fn recall(&self, key: &str) -> Result<Option<MemoryEntry>, StoreError> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn entries(&self) -> Result<BTreeMap<String, MemoryEntry>, StoreError> {
            Ok(self.entries.lock().await.clone())
        }
    }
}

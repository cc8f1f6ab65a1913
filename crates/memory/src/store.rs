//! Whole-document JSON persistence.
//!
//! A `JsonStore<T>` keeps the decoded document behind an `RwLock` and writes
//! the entire document back on every update. Updates run on a copy that is
//! only swapped in after the file write succeeded, and the write lock is held
//! across mutate-and-flush, so readers see either the old or the new
//! document and never anything in between.

use ember_core::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct JsonStore<T> {
    path: Option<PathBuf>,
    state: Arc<RwLock<T>>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Open the document at `path`. A missing file starts from `fallback`;
    /// so does one that cannot be read or parsed.
    pub fn open(path: PathBuf, fallback: T) -> Self {
        let value = load_or(&path, fallback);
        Self {
            path: Some(path),
            state: Arc::new(RwLock::new(value)),
        }
    }

    /// A store that never touches disk.
    pub fn ephemeral(value: T) -> Self {
        Self {
            path: None,
            state: Arc::new(RwLock::new(value)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.state.read().await;
        f(&guard)
    }

    pub async fn snapshot(&self) -> T {
        self.state.read().await.clone()
    }

    /// Read-modify-write as one atomic step.
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let result = f(&mut next);
        if let Some(path) = &self.path {
            write_document(path, &next)?;
        }
        *guard = next;
        Ok(result)
    }
}

fn load_or<T: DeserializeOwned>(path: &Path, fallback: T) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return fallback,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable store, using default");
            return fallback;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => {
            debug!(path = %path.display(), "Store loaded");
            value
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupted store, using default");
            fallback
        }
    }
}

fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |e: std::io::Error| StoreError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialize {
        what: path.display().to_string(),
        reason: e.to_string(),
    })?;

    // Write beside the target and rename so a crash never leaves half a file
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let store = JsonStore::open(path.clone(), BTreeMap::<String, u32>::new());
        store.update(|m| m.insert("runs".into(), 3)).await.unwrap();

        let reopened = JsonStore::open(path, BTreeMap::<String, u32>::new());
        assert_eq!(reopened.read(|m| m.get("runs").copied()).await, Some(3));
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let store = JsonStore::open(path, vec![1u8, 2, 3]);
        assert_eq!(store.snapshot().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failed_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("doc.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let store = JsonStore::open(path, vec![1u8]);
        assert!(store.update(|v| v.push(2)).await.is_err());
        assert_eq!(store.snapshot().await, vec![1]);
    }

    #[tokio::test]
    async fn ephemeral_store_never_writes() {
        let store = JsonStore::ephemeral(0u32);
        store.update(|n| *n += 1).await.unwrap();
        assert_eq!(store.snapshot().await, 1);
        assert!(store.path().is_none());
    }
}

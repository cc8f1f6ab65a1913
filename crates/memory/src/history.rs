//! Conversation history with a bounded retention window.

use chrono::{DateTime, Utc};
use ember_core::error::StoreError;
use ember_core::message::Role;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::store::JsonStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub role: Role,
    pub content: String,
    pub time: DateTime<Utc>,
    /// Tools run to produce an assistant reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_used: Option<usize>,
}

pub struct HistoryStore {
    store: JsonStore<Vec<HistoryRecord>>,
    retention: usize,
}

impl HistoryStore {
    pub fn open(path: PathBuf, retention: usize) -> Self {
        Self {
            store: JsonStore::open(path, Vec::new()),
            retention,
        }
    }

    pub fn ephemeral(retention: usize) -> Self {
        Self {
            store: JsonStore::ephemeral(Vec::new()),
            retention,
        }
    }

    /// Append one finished turn, dropping the oldest records past retention.
    pub async fn append_turn(&self, user: &str, reply: &str, tools_used: usize) -> Result<(), StoreError> {
        let now = Utc::now();
        let retention = self.retention;
        let turn = [
            HistoryRecord {
                role: Role::User,
                content: user.to_string(),
                time: now,
                tools_used: None,
            },
            HistoryRecord {
                role: Role::Assistant,
                content: reply.to_string(),
                time: now,
                tools_used: Some(tools_used),
            },
        ];
        self.store
            .update(move |records| {
                records.extend(turn);
                let excess = records.len().saturating_sub(retention);
                records.drain(..excess);
            })
            .await
    }

    /// The newest `n` records, oldest first.
    pub async fn recent(&self, n: usize) -> Vec<HistoryRecord> {
        self.store
            .read(|records| records[records.len().saturating_sub(n)..].to_vec())
            .await
    }

    pub async fn len(&self) -> usize {
        self.store.read(|r| r.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.update(|records| records.clear()).await
    }
}

//! Per-conversation session state.
//!
//! A [`Session`] is created by whoever accepts a conversation and passed by
//! `&mut` through each agent-loop run, so two conversations never share one.
//! It is never persisted; the only path from here into long-term storage is
//! the eviction summary written by [`Session::record`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};
use crate::memory::{KeyValueMemory, MemoryEntry};
use crate::message::ConversationId;

pub const DEFAULT_SHORT_TERM_CAP: usize = 100;
pub const DEFAULT_ERROR_LOG_CAP: usize = 50;
pub const DEFAULT_AUTOMATION_LOG_CAP: usize = 100;

/// Maximum number of paths quoted in an eviction summary.
const SUMMARY_PATH_LIMIT: usize = 5;

/// Something the agent did: a tool execution or a notable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: None,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A FIFO log that silently drops its oldest item when full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundedLog<T> {
    items: VecDeque<T>,
    cap: usize,
}

impl<T> BoundedLog<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            items: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.cap {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    /// The newest `n` items, oldest first.
    pub fn last(&self, n: usize) -> impl Iterator<Item = &T> {
        self.items.iter().skip(self.items.len().saturating_sub(n))
    }
}

/// Bounded ring buffer of recent actions.
///
/// When a push takes the buffer past its cap, the oldest entries are drained
/// down to half the cap and condensed into one summary sentence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermContext {
    entries: VecDeque<Action>,
    cap: usize,
}

impl ShortTermContext {
    /// `cap` is raised to 2 so that eviction always keeps at least one entry.
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap: cap.max(2),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Action> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Append an action; returns the summary of evicted entries when the
    /// push overflowed the cap.
    pub fn push(&mut self, action: Action) -> Option<String> {
        self.entries.push_back(action);
        if self.entries.len() <= self.cap {
            return None;
        }
        let keep = self.cap / 2;
        let evicted: Vec<Action> = self.entries.drain(..self.entries.len() - keep).collect();
        Some(summarize(&evicted))
    }
}

/// "Actions: a, b. Paths: x, y" over the unique kinds and first few paths.
pub fn summarize(actions: &[Action]) -> String {
    let mut kinds: Vec<&str> = Vec::new();
    for action in actions {
        if !kinds.contains(&action.kind.as_str()) {
            kinds.push(&action.kind);
        }
    }
    let paths: Vec<&str> = actions
        .iter()
        .filter_map(|a| a.path.as_deref())
        .take(SUMMARY_PATH_LIMIT)
        .collect();

    format!("Actions: {}. Paths: {}", kinds.join(", "), paths.join(", "))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub time: DateTime<Utc>,
}

/// One step executed by a scripted recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRecord {
    pub tool: String,
    pub args: serde_json::Value,
    pub success: bool,
    pub time: DateTime<Utc>,
}

/// State for a single conversation.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: ConversationId,
    pub short_term: ShortTermContext,
    pub last_created_path: Option<String>,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub errors: BoundedLog<ErrorRecord>,
    pub automation_log: BoundedLog<AutomationRecord>,
    /// User messages handled in this session so far
    pub turns: u32,
    pub started_at: DateTime<Utc>,
    evictions: u64,
}

impl Session {
    pub fn new(short_term_cap: usize) -> Self {
        Self {
            id: ConversationId::new(),
            short_term: ShortTermContext::new(short_term_cap),
            last_created_path: None,
            total_tokens: 0,
            total_cost: 0.0,
            errors: BoundedLog::new(DEFAULT_ERROR_LOG_CAP),
            automation_log: BoundedLog::new(DEFAULT_AUTOMATION_LOG_CAP),
            turns: 0,
            started_at: Utc::now(),
            evictions: 0,
        }
    }

    /// Append an action. On overflow the eviction summary is written to
    /// `memory` under a fresh `session_summary_*` key.
    pub async fn record(&mut self, action: Action, memory: &dyn KeyValueMemory) {
        let Some(summary) = self.short_term.push(action) else {
            return;
        };
        self.evictions += 1;
        let key = format!(
            "session_summary_{}_{}",
            Utc::now().timestamp_millis(),
            self.evictions
        );
        debug!(key = %key, "Short-term context evicted");
        if let Err(e) = memory.remember(MemoryEntry::auto_summary(&key, summary)).await {
            warn!(key = %key, "Failed to persist eviction summary: {e}");
            self.log_error(format!("Failed to persist {key}: {e}"));
        }
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.errors.push(ErrorRecord {
            message: message.into(),
            time: Utc::now(),
        });
    }

    pub fn add_usage(&mut self, tokens: u32, cost: f64) {
        self.total_tokens += u64::from(tokens);
        self.total_cost += cost;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_SHORT_TERM_CAP)
    }
}

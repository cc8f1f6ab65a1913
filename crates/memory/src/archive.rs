//! Long-term archive: a compacting, keyword-indexed list of summaries.
//!
//! Search is substring matching over content and keywords, returning the
//! first three hits in insertion order. It is recall-oriented and makes no
//! attempt at relevance ranking.
//!
//! When the list grows past its cap, the oldest `block` entries are replaced
//! by one aggregate of type `"archive"`. The push and the compaction happen
//! inside one store update, so no reader can observe the block half-removed.

use chrono::{DateTime, Utc};
use ember_core::error::StoreError;
use ember_core::event::{DomainEvent, EventBus};
use ember_core::memory::ArchiveSummary;
use ember_core::tool::truncate_chars;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use crate::keywords::{extract_keywords, terms};
use crate::store::JsonStore;

pub const MAX_CONTENT_CHARS: usize = 500;
pub const MAX_AGGREGATE_KEYWORDS: usize = 20;
pub const SEARCH_LIMIT: usize = 3;
pub const AGGREGATE_KIND: &str = "archive";

#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    /// High-water mark; compaction runs once the length exceeds it
    pub cap: usize,
    /// How many of the oldest entries fold into one aggregate
    pub block: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self { cap: 500, block: 100 }
    }
}

pub struct Archive {
    store: JsonStore<Vec<ArchiveSummary>>,
    limits: ArchiveLimits,
    events: Option<Arc<EventBus>>,
}

impl Archive {
    pub fn open(path: PathBuf, limits: ArchiveLimits) -> Self {
        Self {
            store: JsonStore::open(path, Vec::new()),
            limits,
            events: None,
        }
    }

    pub fn ephemeral(limits: ArchiveLimits) -> Self {
        Self {
            store: JsonStore::ephemeral(Vec::new()),
            limits,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Create one summary, compacting the oldest block if the archive is now
    /// over its cap.
    pub async fn add(&self, content: &str, kind: &str) -> Result<ArchiveSummary, StoreError> {
        let summary = ArchiveSummary {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            content: truncate_chars(content, MAX_CONTENT_CHARS).to_string(),
            keywords: extract_keywords(content),
            created_at: Utc::now(),
        };

        let limits = self.limits;
        let entry = summary.clone();
        let compactions = self
            .store
            .update(move |entries| {
                entries.push(entry);
                let mut replaced = Vec::new();
                while entries.len() > limits.cap {
                    match compact(entries, limits.block) {
                        Some(n) => replaced.push(n),
                        None => break,
                    }
                }
                (replaced, entries.len())
            })
            .await?;

        let (replaced, remaining) = compactions;
        for n in replaced {
            info!(replaced = n, remaining, "Archive compacted");
            if let Some(events) = &self.events {
                events.publish(DomainEvent::ArchiveCompacted {
                    replaced: n,
                    remaining,
                    timestamp: Utc::now(),
                });
            }
        }

        Ok(summary)
    }

    /// First three summaries where any query keyword is a substring of the
    /// entry's lower-cased content or keywords.
    pub async fn search(&self, query: &str) -> Vec<ArchiveSummary> {
        let needles = terms(query);
        if needles.is_empty() {
            return Vec::new();
        }

        self.store
            .read(|entries| {
                entries
                    .iter()
                    .filter(|e| {
                        let haystack = format!("{} {}", e.content.to_lowercase(), e.keywords.join(" "));
                        needles.iter().any(|n| haystack.contains(n.as_str()))
                    })
                    .take(SEARCH_LIMIT)
                    .cloned()
                    .collect()
            })
            .await
    }

    pub async fn len(&self) -> usize {
        self.store.read(|e| e.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn entries(&self) -> Vec<ArchiveSummary> {
        self.store.snapshot().await
    }
}

/// Replace the oldest `block` entries (or all, if fewer) with one aggregate.
/// Returns how many entries were replaced; `None` when there is nothing
/// worth folding.
pub fn compact(entries: &mut Vec<ArchiveSummary>, block: usize) -> Option<usize> {
    let n = block.min(entries.len());
    if n < 2 {
        return None;
    }

    let replaced: Vec<ArchiveSummary> = entries.drain(..n).collect();
    let first = replaced.first().map(|e| e.created_at).unwrap_or_else(Utc::now);
    let last = replaced.last().map(|e| e.created_at).unwrap_or_else(Utc::now);

    let mut keywords: Vec<String> = Vec::new();
    for kw in replaced.iter().flat_map(|e| e.keywords.iter()) {
        if keywords.len() == MAX_AGGREGATE_KEYWORDS {
            break;
        }
        if !keywords.contains(kw) {
            keywords.push(kw.clone());
        }
    }

    entries.insert(
        0,
        ArchiveSummary {
            id: Uuid::new_v4().to_string(),
            kind: AGGREGATE_KIND.to_string(),
            content: format!("Archive of {n} items from {} to {}", stamp(first), stamp(last)),
            keywords,
            created_at: Utc::now(),
        },
    );
    Some(n)
}

fn stamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

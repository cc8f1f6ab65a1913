//! Domain event system: decoupled observation of the agent loop.
//!
//! The loop publishes what it does; the CLI's verbose mode and tests
//! subscribe. Nothing in the runtime depends on an event being received.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The loop produced its final reply (complete or incomplete)
    ResponseGenerated {
        conversation_id: String,
        model: String,
        iterations: u32,
        tokens_used: u64,
        timestamp: DateTime<Utc>,
    },

    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A mood event was applied
    MoodChanged {
        event: String,
        label: String,
        energy: u8,
        timestamp: DateTime<Utc>,
    },

    /// The oldest archive block was folded into one aggregate entry
    ArchiveCompacted {
        replaced: usize,
        remaining: usize,
        timestamp: DateTime<Utc>,
    },

    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

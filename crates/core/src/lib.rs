//! # Ember Core
//!
//! Domain types, traits, and error definitions for the Ember agent runtime.
//! Every other crate in the workspace depends inward on this one.
//!
//! - [`tool`] holds the capability interface every tool implements and the
//!   registry that validates and dispatches calls.
//! - [`session`] is the per-conversation state threaded through a loop run.
//! - [`memory`] defines the persistent memory records and the key/value seam
//!   the session uses to spill evicted context.
//! - [`provider`] is the language-model backend contract.

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod schema;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use memory::{ArchiveSummary, KeyValueMemory, MemoryEntry, MemoryOrigin};
pub use message::{ConversationId, Message, MessageToolCall, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use session::{Action, Session};
pub use tool::{Tool, ToolContext, ToolOutcome, ToolRegistry};

//! Persistent stores for Ember.
//!
//! Every store is one JSON document rewritten whole on each mutation
//! ([`JsonStore`]). A document that fails to parse is replaced by the
//! store's default rather than aborting startup.

pub mod archive;
pub mod history;
pub mod keywords;
pub mod kv;
pub mod store;

pub use archive::{Archive, ArchiveLimits};
pub use history::{HistoryRecord, HistoryStore};
pub use keywords::extract_keywords;
pub use kv::KvStore;
pub use store::JsonStore;

//! The process-wide persistent state, opened once and shared by every
//! conversation.
//!
//! Each store serializes its own read-modify-write cycles; the agent loop
//! additionally holds [`Stores::turn_lock`] while it writes one turn's
//! bookkeeping so two conversations never interleave their updates.

use ember_config::MemoryConfig;
use ember_core::event::EventBus;
use ember_memory::{Archive, ArchiveLimits, HistoryStore, KvStore};
use ember_persona::identity::PERSONA_FILE;
use ember_persona::{Identity, MoodTracker, ProfileTracker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const MEMORY_FILE: &str = "memory.json";
pub const ARCHIVE_FILE: &str = "archive.json";
pub const HISTORY_FILE: &str = "history.json";
pub const MOOD_FILE: &str = "mood.json";
pub const PROFILE_FILE: &str = "profile.json";

pub struct Stores {
    pub memory: Arc<KvStore>,
    pub archive: Arc<Archive>,
    pub history: Arc<HistoryStore>,
    pub mood: Arc<MoodTracker>,
    pub profile: Arc<ProfileTracker>,
    pub identity: Identity,
    pub events: Arc<EventBus>,
    data_dir: Option<PathBuf>,
    turn_lock: Mutex<()>,
}

impl Stores {
    /// Open every store under `data_dir`. Missing or corrupt files start
    /// from their defaults.
    pub fn open(data_dir: &Path, config: &MemoryConfig, events: Arc<EventBus>) -> Self {
        let limits = ArchiveLimits {
            cap: config.archive_cap,
            block: config.compaction_block,
        };
        Self {
            memory: Arc::new(KvStore::open(data_dir.join(MEMORY_FILE))),
            archive: Arc::new(
                Archive::open(data_dir.join(ARCHIVE_FILE), limits).with_events(events.clone()),
            ),
            history: Arc::new(HistoryStore::open(
                data_dir.join(HISTORY_FILE),
                config.history_retention,
            )),
            mood: Arc::new(
                MoodTracker::open(data_dir.join(MOOD_FILE), config.mood_history_cap)
                    .with_events(events.clone()),
            ),
            profile: Arc::new(ProfileTracker::open(data_dir.join(PROFILE_FILE))),
            identity: Identity::load_or_init(&data_dir.join(PERSONA_FILE)),
            events,
            data_dir: Some(data_dir.to_path_buf()),
            turn_lock: Mutex::new(()),
        }
    }

    /// In-memory stores for tests and dry runs.
    pub fn ephemeral(config: &MemoryConfig) -> Self {
        let events = Arc::new(EventBus::default());
        let limits = ArchiveLimits {
            cap: config.archive_cap,
            block: config.compaction_block,
        };
        Self {
            memory: Arc::new(KvStore::ephemeral()),
            archive: Arc::new(Archive::ephemeral(limits).with_events(events.clone())),
            history: Arc::new(HistoryStore::ephemeral(config.history_retention)),
            mood: Arc::new(MoodTracker::ephemeral(config.mood_history_cap).with_events(events.clone())),
            profile: Arc::new(ProfileTracker::ephemeral()),
            identity: Identity::default(),
            events,
            data_dir: None,
            turn_lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Held while one turn's bookkeeping is written.
    pub async fn lock_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }
}

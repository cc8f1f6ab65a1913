//! User profile and relationship tier.
//!
//! The tier is a pure function of the interaction count and is never stored.

use chrono::{DateTime, Local, Timelike, Utc};
use ember_core::error::StoreError;
use ember_core::tool::truncate_chars;
use ember_memory::JsonStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use crate::markers::{contains_any, EXCITEMENT_MARKERS, FRUSTRATION_MARKERS};

pub const TRIGGER_LOG_CAP: usize = 20;
const TRIGGER_CONTEXT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipTier {
    New,
    GettingStarted,
    Acquainted,
    Familiar,
    Close,
}

impl RelationshipTier {
    /// Step function over cumulative interactions.
    pub fn from_interactions(count: u64) -> Self {
        match count {
            101.. => Self::Close,
            51..=100 => Self::Familiar,
            21..=50 => Self::Acquainted,
            6..=20 => Self::GettingStarted,
            _ => Self::New,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::GettingStarted => "getting started",
            Self::Acquainted => "getting to know each other",
            Self::Familiar => "familiar friend",
            Self::Close => "close collaborator",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipStats {
    #[serde(default)]
    pub total_interactions: u64,
    #[serde(default)]
    pub first_interaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub context: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patterns {
    #[serde(default)]
    pub frustration_triggers: Vec<Trigger>,
    #[serde(default)]
    pub excitement_triggers: Vec<Trigger>,
    /// Local hour of day to message count
    #[serde(default)]
    pub active_hours: BTreeMap<u32, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user: UserIdentity,
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
    #[serde(default)]
    pub relationship: RelationshipStats,
    #[serde(default)]
    pub patterns: Patterns,
}

/// What an inbound message revealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageSignals {
    pub frustrated: bool,
    pub excited: bool,
}

impl UserProfile {
    pub fn tier(&self) -> RelationshipTier {
        RelationshipTier::from_interactions(self.relationship.total_interactions)
    }

    /// Preferred name, then name, then a neutral fallback.
    pub fn display_name(&self) -> &str {
        self.user
            .preferred_name
            .as_deref()
            .or(self.user.name.as_deref())
            .unwrap_or("the user")
    }

    /// Fold one inbound message into the counters and trigger logs.
    pub fn observe(&mut self, message: &str, hour: u32) -> MessageSignals {
        let signals = MessageSignals {
            frustrated: contains_any(message, FRUSTRATION_MARKERS),
            excited: contains_any(message, EXCITEMENT_MARKERS),
        };
        let now = Utc::now();
        let context = truncate_chars(message, TRIGGER_CONTEXT_CHARS);

        if signals.frustrated {
            push_capped(&mut self.patterns.frustration_triggers, Trigger { context: context.into(), time: now });
        }
        if signals.excited {
            push_capped(&mut self.patterns.excitement_triggers, Trigger { context: context.into(), time: now });
        }

        *self.patterns.active_hours.entry(hour).or_insert(0) += 1;
        self.relationship.total_interactions += 1;
        self.relationship.first_interaction.get_or_insert(now);
        signals
    }

    /// "Relationship with Ada: familiar friend (64 interactions)."
    pub fn relationship_note(&self) -> String {
        format!(
            "Relationship with {}: {} ({} interactions).",
            self.display_name(),
            self.tier().label(),
            self.relationship.total_interactions
        )
    }
}

fn push_capped(log: &mut Vec<Trigger>, trigger: Trigger) {
    log.push(trigger);
    let excess = log.len().saturating_sub(TRIGGER_LOG_CAP);
    log.drain(..excess);
}

/// Persisted user profile.
pub struct ProfileTracker {
    store: JsonStore<UserProfile>,
}

impl ProfileTracker {
    pub fn open(path: PathBuf) -> Self {
        Self {
            store: JsonStore::open(path, UserProfile::default()),
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            store: JsonStore::ephemeral(UserProfile::default()),
        }
    }

    pub async fn observe(&self, message: &str) -> Result<MessageSignals, StoreError> {
        let hour = Local::now().hour();
        let message = message.to_string();
        self.store.update(move |p| p.observe(&message, hour)).await
    }

    pub async fn set_name(&self, name: &str) -> Result<(), StoreError> {
        let name = name.to_string();
        self.store.update(move |p| p.user.name = Some(name)).await
    }

    pub async fn set_preferred_name(&self, name: &str) -> Result<(), StoreError> {
        let name = name.to_string();
        self.store.update(move |p| p.user.preferred_name = Some(name)).await
    }

    pub async fn set_preference(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.store
            .update(move |p| {
                p.preferences.insert(key, value);
            })
            .await
    }

    pub async fn profile(&self) -> UserProfile {
        self.store.snapshot().await
    }
}

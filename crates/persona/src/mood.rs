//! Mood and self-model tracking.
//!
//! Mood only moves through [`MoodEvent`]'s fixed effect table. Energy is
//! clamped to `0..=100` after every event and each change is persisted
//! before the call returns.
//!
//! When a turn fires several events at once they are applied in ascending
//! [`MoodEvent::precedence`], so the final label always belongs to the
//! highest-precedence event regardless of the order they were detected in.

use chrono::{DateTime, Local, Timelike, Utc};
use ember_core::error::StoreError;
use ember_core::event::{DomainEvent, EventBus};
use ember_memory::JsonStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub const MAX_ENERGY: u8 = 100;
pub const DEFAULT_HISTORY_CAP: usize = 50;
const FAVORITE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodEvent {
    TaskSuccess,
    TaskFailure,
    LongSession,
    UserPraise,
    UserFrustration,
    CreativeTask,
    BoringTask,
}

impl MoodEvent {
    pub const ALL: [MoodEvent; 7] = [
        MoodEvent::TaskSuccess,
        MoodEvent::TaskFailure,
        MoodEvent::LongSession,
        MoodEvent::UserPraise,
        MoodEvent::UserFrustration,
        MoodEvent::CreativeTask,
        MoodEvent::BoringTask,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskSuccess => "task_success",
            Self::TaskFailure => "task_failure",
            Self::LongSession => "long_session",
            Self::UserPraise => "user_praise",
            Self::UserFrustration => "user_frustration",
            Self::CreativeTask => "creative_task",
            Self::BoringTask => "boring_task",
        }
    }

    /// Signed energy delta and resulting label.
    pub fn effect(self) -> (i16, &'static str) {
        match self {
            Self::TaskSuccess => (5, "satisfied"),
            Self::TaskFailure => (-10, "focused"),
            Self::LongSession => (-5, "tired"),
            Self::UserPraise => (10, "happy"),
            Self::UserFrustration => (-5, "concerned"),
            Self::CreativeTask => (5, "excited"),
            Self::BoringTask => (-3, "neutral"),
        }
    }

    /// Higher wins the label when events share a turn. What the user said
    /// outranks how the tools went, which outranks ambient fatigue.
    pub fn precedence(self) -> u8 {
        match self {
            Self::BoringTask => 0,
            Self::LongSession => 1,
            Self::TaskSuccess | Self::TaskFailure => 2,
            Self::CreativeTask => 3,
            Self::UserFrustration => 4,
            Self::UserPraise => 5,
        }
    }
}

impl std::fmt::Display for MoodEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplicate and sort into application order (lowest precedence first).
pub fn application_order(events: &[MoodEvent]) -> Vec<MoodEvent> {
    let mut ordered: Vec<MoodEvent> = Vec::new();
    for e in events {
        if !ordered.contains(e) {
            ordered.push(*e);
        }
    }
    ordered.sort_by_key(|e| e.precedence());
    ordered
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodChange {
    pub event: MoodEvent,
    pub label: String,
    pub energy: u8,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodState {
    pub current: String,
    pub energy: u8,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<MoodChange>,
}

impl Default for MoodState {
    fn default() -> Self {
        Self {
            current: "neutral".into(),
            energy: MAX_ENERGY,
            last_update: None,
            history: Vec::new(),
        }
    }
}

impl MoodState {
    pub fn apply(&mut self, event: MoodEvent, history_cap: usize) {
        let (delta, label) = event.effect();
        let energy = (i16::from(self.energy) + delta).clamp(0, i16::from(MAX_ENERGY));
        self.energy = energy as u8;
        self.current = label.to_string();
        let now = Utc::now();
        self.last_update = Some(now);
        self.history.push(MoodChange {
            event,
            label: label.to_string(),
            energy: self.energy,
            time: now,
        });
        let excess = self.history.len().saturating_sub(history_cap);
        self.history.drain(..excess);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub count: u64,
}

/// What the agent has learned about its own work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfModel {
    #[serde(default)]
    pub tasks_completed: u64,
    /// Most-used successful tools, highest count first
    #[serde(default)]
    pub favorite_activities: Vec<Activity>,
}

impl SelfModel {
    fn note_success(&mut self, activity: &str) {
        self.tasks_completed += 1;
        match self.favorite_activities.iter_mut().find(|a| a.name == activity) {
            Some(a) => a.count += 1,
            None => self.favorite_activities.push(Activity {
                name: activity.to_string(),
                count: 1,
            }),
        }
        self.favorite_activities.sort_by(|a, b| b.count.cmp(&a.count));
        self.favorite_activities.truncate(FAVORITE_LIMIT);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaStats {
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub total_tool_calls: u64,
    #[serde(default)]
    pub sessions: u64,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

/// The persisted mood/self-model document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    #[serde(default)]
    pub mood: MoodState,
    #[serde(default)]
    pub self_model: SelfModel,
    #[serde(default)]
    pub stats: PersonaStats,
}

/// The part of the mood callers report back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSnapshot {
    pub label: String,
    pub energy: u8,
}

pub struct MoodTracker {
    store: JsonStore<PersonaRecord>,
    history_cap: usize,
    events: Option<Arc<EventBus>>,
}

impl MoodTracker {
    pub fn open(path: PathBuf, history_cap: usize) -> Self {
        Self {
            store: JsonStore::open(path, PersonaRecord::default()),
            history_cap,
            events: None,
        }
    }

    pub fn ephemeral(history_cap: usize) -> Self {
        Self {
            store: JsonStore::ephemeral(PersonaRecord::default()),
            history_cap,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn apply(&self, event: MoodEvent) -> Result<MoodSnapshot, StoreError> {
        self.apply_all(&[event]).await
    }

    /// Apply a turn's events in precedence order as one persisted update.
    pub async fn apply_all(&self, events: &[MoodEvent]) -> Result<MoodSnapshot, StoreError> {
        let ordered = application_order(events);
        let cap = self.history_cap;
        let applied = ordered.clone();
        let snapshot = self
            .store
            .update(move |record| {
                for event in applied {
                    record.mood.apply(event, cap);
                }
                snapshot_of(&record.mood)
            })
            .await?;

        for event in ordered {
            debug!(event = %event, label = %snapshot.label, energy = snapshot.energy, "Mood event applied");
            if let Some(bus) = &self.events {
                bus.publish(DomainEvent::MoodChanged {
                    event: event.to_string(),
                    label: snapshot.label.clone(),
                    energy: snapshot.energy,
                    timestamp: Utc::now(),
                });
            }
        }
        Ok(snapshot)
    }

    /// Count a handled message and the tools it ran.
    pub async fn record_turn(&self, succeeded_tools: &[String], tool_calls: usize) -> Result<(), StoreError> {
        let succeeded = succeeded_tools.to_vec();
        self.store
            .update(move |record| {
                record.stats.total_messages += 1;
                record.stats.total_tool_calls += tool_calls as u64;
                record.stats.last_active = Some(Utc::now());
                for tool in &succeeded {
                    record.self_model.note_success(tool);
                }
            })
            .await
    }

    /// Mark the start of a new process-level session.
    pub async fn start_session(&self) -> Result<(), StoreError> {
        self.store
            .update(|record| {
                record.stats.sessions += 1;
                record.stats.last_active = Some(Utc::now());
            })
            .await
    }

    pub async fn snapshot(&self) -> MoodSnapshot {
        self.store.read(|record| snapshot_of(&record.mood)).await
    }

    pub async fn record(&self) -> PersonaRecord {
        self.store.snapshot().await
    }

    /// One-line mood note for the system prompt, at the current local hour.
    pub async fn context_note(&self) -> String {
        let hour = Local::now().hour();
        self.store.read(|record| mood_context(&record.mood, hour)).await
    }
}

fn snapshot_of(mood: &MoodState) -> MoodSnapshot {
    MoodSnapshot {
        label: mood.current.clone(),
        energy: mood.energy,
    }
}

pub fn mood_context(mood: &MoodState, hour: u32) -> String {
    let time_of_day = match hour {
        0..=5 => "late at night",
        6..=11 => "in the morning",
        12..=17 => "in the afternoon",
        _ => "in the evening",
    };
    let energy = match mood.energy {
        71.. => "energetic",
        41..=70 => "steady",
        _ => "a bit tired",
    };
    format!("Current mood: {}, feeling {energy}. It's {time_of_day}.", mood.current)
}

/// Optional flavour line based on mood.
pub fn personality_note(mood: &MoodState) -> Option<&'static str> {
    if mood.energy < 30 {
        Some("I'm running a bit low on energy but still here to help.")
    } else if mood.current == "happy" {
        Some("Feeling good today!")
    } else if mood.current == "excited" {
        Some("Excited to work on this!")
    } else {
        None
    }
}

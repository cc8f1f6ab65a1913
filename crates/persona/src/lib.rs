//! Affective state and relationship tracking.
//!
//! Both records only color the system prompt; nothing here gates what the
//! agent is allowed to do.

pub mod identity;
pub mod markers;
pub mod mood;
pub mod profile;

pub use identity::Identity;
pub use mood::{MoodEvent, MoodSnapshot, MoodTracker, PersonaRecord};
pub use profile::{ProfileTracker, RelationshipTier, UserProfile};

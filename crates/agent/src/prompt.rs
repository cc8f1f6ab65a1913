//! System prompt assembly.
//!
//! The prompt is rebuilt for every user message from live state, in this
//! order:
//!
//! 1. Identity (name, tagline, traits)
//! 2. Relationship and mood notes
//! 3. The tool catalog, read from the registry's definitions
//! 4. Numbered operating rules
//! 5. Immediate session context (mood, last created path, recent actions)
//! 6. Memory overview and the user's address
//! 7. Archive excerpts matching the message
//!
//! [`build_system_prompt`] is pure; [`PromptBuilder`] gathers its inputs
//! from the stores.

use crate::stores::Stores;
use chrono::{Local, Timelike};
use ember_core::memory::ArchiveSummary;
use ember_core::provider::ToolDefinition;
use ember_core::session::Session;
use ember_persona::mood::{MoodState, mood_context, personality_note};
use ember_persona::{Identity, UserProfile};
use std::fmt::Write;

/// Memory keys listed by name before the rest are elided.
pub const LISTED_MEMORY_KEYS: usize = 10;

/// Short-term actions shown under "Recent".
pub const RECENT_ACTIONS: usize = 5;

// ── Types ─────────────────────────────────────────────────────────────────

/// Everything one prompt is built from.
pub struct PromptInput<'a> {
    pub identity: &'a Identity,
    pub tools: &'a [ToolDefinition],
    pub memory_keys: &'a [String],
    pub mood: &'a MoodState,
    /// Local hour of day, 0-23
    pub hour: u32,
    pub profile: &'a UserProfile,
    pub session: &'a Session,
    /// Archive matches for the incoming message, already truncated
    pub recalled: &'a [ArchiveSummary],
}

// ── Assembly ──────────────────────────────────────────────────────────────

pub fn build_system_prompt(input: &PromptInput<'_>) -> String {
    let identity = input.identity;
    let mut prompt = String::with_capacity(2048);

    let _ = write!(prompt, "You are {}, {}.", identity.name, identity.tagline);
    if !identity.traits.is_empty() {
        let _ = write!(prompt, " Your traits: {}.", identity.traits.join(", "));
    }
    let _ = write!(prompt, "\n{}", input.profile.relationship_note());
    if let Some(note) = personality_note(input.mood) {
        let _ = write!(prompt, "\nMood: {note}");
    }

    prompt.push_str("\n\nAVAILABLE TOOLS:");
    for tool in input.tools {
        let _ = write!(prompt, "\n- {}: {}", tool.name, tool.description);
    }

    if !identity.rules.is_empty() {
        prompt.push_str("\n\nRULES:");
        for (i, rule) in identity.rules.iter().enumerate() {
            let _ = write!(prompt, "\n{}. {rule}", i + 1);
        }
    }

    prompt.push_str(
        "\n\nSELF-AWARENESS:\
         \n- Use get_self_awareness to check your mood, energy and relationship with the user.\
         \n- Use get_context to see what you have done this session.\
         \n- Use set_user_info when the user tells you their name or a preference.",
    );

    prompt.push_str("\n\nIMMEDIATE CONTEXT:\n");
    prompt.push_str(&mood_context(input.mood, input.hour));
    if let Some(path) = &input.session.last_created_path {
        let _ = write!(prompt, "\nLast created: {path}");
    }
    let recent: Vec<&str> = input
        .session
        .short_term
        .iter()
        .rev()
        .take(RECENT_ACTIONS)
        .rev()
        .map(|a| a.kind.as_str())
        .collect();
    if !recent.is_empty() {
        let _ = write!(prompt, "\nRecent: {}", recent.join(", "));
    }

    prompt.push_str("\n\nMEMORY:");
    let keys = if input.memory_keys.is_empty() {
        "none".to_string()
    } else {
        let listed: Vec<&str> = input
            .memory_keys
            .iter()
            .take(LISTED_MEMORY_KEYS)
            .map(String::as_str)
            .collect();
        listed.join(", ")
    };
    let _ = write!(prompt, "\n- Keys: {keys}");
    let _ = write!(
        prompt,
        "\n- Total interactions: {}",
        input.profile.relationship.total_interactions
    );
    let _ = write!(prompt, "\n- Session tokens: {}", input.session.total_tokens);

    let _ = write!(prompt, "\n\nADDRESS THE USER AS: {}", input.profile.display_name());

    if !input.recalled.is_empty() {
        prompt.push_str("\n\nRELEVANT MEMORIES:");
        for entry in input.recalled {
            let _ = write!(prompt, "\n- {}", entry.content);
        }
    }

    prompt
}

// ── Gathering ─────────────────────────────────────────────────────────────

/// Reads live state out of the stores and hands it to [`build_system_prompt`].
pub struct PromptBuilder {
    recall_excerpts: usize,
}

impl PromptBuilder {
    pub fn new(recall_excerpts: usize) -> Self {
        Self { recall_excerpts }
    }

    pub async fn build(
        &self,
        stores: &Stores,
        tools: &[ToolDefinition],
        session: &Session,
        message: &str,
    ) -> String {
        let memory_keys = stores.memory.keys().await;
        let mood = stores.mood.record().await.mood;
        let profile = stores.profile.profile().await;
        let mut recalled = stores.archive.search(message).await;
        recalled.truncate(self.recall_excerpts);

        build_system_prompt(&PromptInput {
            identity: &stores.identity,
            tools,
            memory_keys: &memory_keys,
            mood: &mood,
            hour: Local::now().hour(),
            profile: &profile,
            session,
            recalled: &recalled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_config::MemoryConfig;
    use ember_core::session::Action;

    fn tool(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    fn render(
        tools: &[ToolDefinition],
        keys: &[String],
        session: &Session,
        profile: &UserProfile,
        recalled: &[ArchiveSummary],
    ) -> String {
        build_system_prompt(&PromptInput {
            identity: &Identity::default(),
            tools,
            memory_keys: keys,
            mood: &MoodState::default(),
            hour: 9,
            profile,
            session,
            recalled,
        })
    }

    #[test]
    fn catalog_mirrors_tool_definitions() {
        let tools = vec![tool("bash", "Run a command"), tool("recall", "Read memory")];
        let prompt = render(&tools, &[], &Session::new(10), &UserProfile::default(), &[]);

        assert!(prompt.starts_with("You are Ember"));
        assert!(prompt.contains("AVAILABLE TOOLS:\n- bash: Run a command\n- recall: Read memory"));
        assert!(prompt.contains("1. Always use the exact path"));
    }

    #[test]
    fn empty_state_renders_fallbacks() {
        let prompt = render(&[], &[], &Session::new(10), &UserProfile::default(), &[]);

        assert!(prompt.contains("- Keys: none"));
        assert!(prompt.contains("- Total interactions: 0"));
        assert!(prompt.contains("ADDRESS THE USER AS: the user"));
        assert!(prompt.contains("in the morning"));
        assert!(!prompt.contains("Last created:"));
        assert!(!prompt.contains("Recent:"));
        assert!(!prompt.contains("RELEVANT MEMORIES"));
    }

    #[test]
    fn only_first_ten_keys_are_listed() {
        let keys: Vec<String> = (0..12).map(|i| format!("k{i:02}")).collect();
        let prompt = render(&[], &keys, &Session::new(10), &UserProfile::default(), &[]);

        assert!(prompt.contains("k09"));
        assert!(!prompt.contains("k10"));
    }

    #[test]
    fn session_activity_appears_in_immediate_context() {
        let mut session = Session::new(20);
        session.last_created_path = Some("notes.txt".into());
        for kind in ["a1", "a2", "a3", "a4", "a5", "a6"] {
            session.short_term.push(Action::new(kind));
        }
        session.total_tokens = 321;

        let prompt = render(&[], &[], &session, &UserProfile::default(), &[]);
        assert!(prompt.contains("Last created: notes.txt"));
        assert!(prompt.contains("Recent: a2, a3, a4, a5, a6"));
        assert!(prompt.contains("- Session tokens: 321"));
    }

    #[test]
    fn preferred_name_and_recalled_entries() {
        let mut profile = UserProfile::default();
        profile.user.preferred_name = Some("Ada".into());
        let recalled = vec![ArchiveSummary {
            id: "1".into(),
            kind: "note".into(),
            content: "the deploy key lives in vault".into(),
            keywords: vec!["deploy".into()],
            created_at: chrono::Utc::now(),
        }];

        let prompt = render(&[], &[], &Session::new(10), &profile, &recalled);
        assert!(prompt.contains("ADDRESS THE USER AS: Ada"));
        assert!(prompt.contains("Relationship with Ada"));
        assert!(prompt.ends_with("RELEVANT MEMORIES:\n- the deploy key lives in vault"));
    }

    #[tokio::test]
    async fn builder_reads_stores() {
        let config = MemoryConfig {
            recall_excerpts: 1,
            ..MemoryConfig::default()
        };
        let stores = Stores::ephemeral(&config);
        stores.archive.add("rotate the deploy credentials weekly", "note").await.unwrap();
        stores.archive.add("deploy pipeline runs nightly", "note").await.unwrap();

        let prompt = PromptBuilder::new(config.recall_excerpts)
            .build(&stores, &[], &Session::new(10), "when does deploy happen")
            .await;

        assert!(prompt.contains("- rotate the deploy credentials weekly"));
        assert!(!prompt.contains("pipeline runs nightly"));
    }
}

//! Persona-facing tools: `get_self_awareness` and `set_user_info`.

use async_trait::async_trait;
use ember_core::error::{StoreError, ToolError};
use ember_core::tool::{Tool, ToolContext};
use ember_persona::{MoodTracker, ProfileTracker};
use std::sync::Arc;

pub struct SelfAwarenessTool {
    mood: Arc<MoodTracker>,
    profile: Arc<ProfileTracker>,
}

impl SelfAwarenessTool {
    pub fn new(mood: Arc<MoodTracker>, profile: Arc<ProfileTracker>) -> Self {
        Self { mood, profile }
    }
}

#[async_trait]
impl Tool for SelfAwarenessTool {
    fn name(&self) -> &str {
        "get_self_awareness"
    }

    fn description(&self) -> &str {
        "Check your own mood, energy, work history and relationship with the user."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let record = self.mood.record().await;
        let profile = self.profile.profile().await;

        let report = serde_json::json!({
            "mood": {
                "current": record.mood.current,
                "energy": record.mood.energy,
                "note": self.mood.context_note().await,
            },
            "self_model": record.self_model,
            "stats": record.stats,
            "relationship": {
                "user": profile.display_name(),
                "tier": profile.tier().label(),
                "interactions": profile.relationship.total_interactions,
                "first_interaction": profile.relationship.first_interaction,
            },
        });
        serde_json::to_string_pretty(&report).map_err(|e| ToolError::failed("get_self_awareness", e))
    }
}

pub struct SetUserInfoTool {
    profile: Arc<ProfileTracker>,
}

impl SetUserInfoTool {
    pub fn new(profile: Arc<ProfileTracker>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl Tool for SetUserInfoTool {
    fn name(&self) -> &str {
        "set_user_info"
    }

    fn description(&self) -> &str {
        "Remember who the user is: their name, what they like to be called, or a \
         preference given as key=value."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "The user's name" },
                "preferred_name": { "type": "string", "description": "What they like to be called" },
                "preference": { "type": "string", "description": "A preference as key=value" }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let store_err = |e: StoreError| ToolError::failed("set_user_info", e);
        let mut updated = Vec::new();

        if let Some(name) = arguments["name"].as_str() {
            self.profile.set_name(name).await.map_err(store_err)?;
            updated.push(format!("name = {name}"));
        }
        if let Some(name) = arguments["preferred_name"].as_str() {
            self.profile.set_preferred_name(name).await.map_err(store_err)?;
            updated.push(format!("preferred_name = {name}"));
        }
        if let Some(pref) = arguments["preference"].as_str() {
            let (key, value) = pref
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!("preference must be key=value, got '{pref}'"))
                })?;
            self.profile.set_preference(key, value).await.map_err(store_err)?;
            updated.push(format!("{key} = {value}"));
        }

        if updated.is_empty() {
            return Err(ToolError::InvalidArguments(
                "provide at least one of name, preferred_name, preference".into(),
            ));
        }
        Ok(format!("Updated user info: {}", updated.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::session::Session;
    use ember_memory::KvStore;

    #[tokio::test]
    async fn set_user_info_updates_profile() {
        let profile = Arc::new(ProfileTracker::ephemeral());
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let out = SetUserInfoTool::new(profile.clone())
            .execute(
                serde_json::json!({"name": "Ada Lovelace", "preferred_name": "Ada", "preference": "editor = helix"}),
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(out.contains("editor = helix"));

        let p = profile.profile().await;
        assert_eq!(p.display_name(), "Ada");
        assert_eq!(p.user.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(p.preferences.get("editor").map(String::as_str), Some("helix"));
    }

    #[tokio::test]
    async fn malformed_preference_is_rejected() {
        let profile = Arc::new(ProfileTracker::ephemeral());
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let tool = SetUserInfoTool::new(profile);
        assert!(tool.execute(serde_json::json!({"preference": "no-equals"}), &mut ctx).await.is_err());
        assert!(tool.execute(serde_json::json!({}), &mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn self_awareness_reports_mood_and_tier() {
        let mood = Arc::new(MoodTracker::ephemeral(50));
        let profile = Arc::new(ProfileTracker::ephemeral());
        profile.observe("hello").await.unwrap();

        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        let out = SelfAwarenessTool::new(mood, profile)
            .execute(serde_json::json!({}), &mut ctx)
            .await
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["mood"]["current"], "neutral");
        assert_eq!(parsed["mood"]["energy"], 100);
        assert_eq!(parsed["relationship"]["tier"], "new");
        assert_eq!(parsed["relationship"]["interactions"], 1);
        assert_eq!(parsed["relationship"]["user"], "the user");
    }
}

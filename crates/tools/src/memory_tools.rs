//! `remember` / `recall`: the model's handle on key/value memory.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::memory::{MemoryEntry, RECALL_ALL_KEY, recall_text};
use ember_core::session::Action;
use ember_core::tool::{Tool, ToolContext};

pub struct RememberTool;

#[async_trait]
impl Tool for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }

    fn description(&self) -> &str {
        "Store a fact in long-term memory under a key. Overwrites any previous value."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key": { "type": "string", "description": "Short identifier for the fact" },
                "value": { "type": "string", "description": "The fact to remember" }
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let key = arguments["key"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'key' argument".into()))?;
        let value = arguments["value"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'value' argument".into()))?;

        if key.trim().is_empty() || key == RECALL_ALL_KEY {
            return Err(ToolError::InvalidArguments(format!(
                "'{key}' cannot be used as a memory key"
            )));
        }

        ctx.memory
            .remember(MemoryEntry::explicit(key, value))
            .await
            .map_err(|e| ToolError::failed("remember", e))?;
        ctx.record(Action::new("remembered").with_detail(key)).await;

        Ok(format!("Remembered '{key}'"))
    }
}

pub struct RecallTool;

#[async_trait]
impl Tool for RecallTool {
    fn name(&self) -> &str {
        "recall"
    }

    fn description(&self) -> &str {
        "Recall a fact from long-term memory by key. Use key \"all\" to list everything."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key": { "type": "string", "description": "The key to look up, or \"all\"" }
            },
            "required": ["key"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let key = arguments["key"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'key' argument".into()))?;

        recall_text(ctx.memory, key)
            .await
            .map_err(|e| ToolError::failed("recall", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::session::Session;
    use ember_memory::KvStore;

    #[tokio::test]
    async fn remember_then_recall() {
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        RememberTool
            .execute(serde_json::json!({"key": "editor", "value": "helix"}), &mut ctx)
            .await
            .unwrap();
        let out = RecallTool
            .execute(serde_json::json!({"key": "editor"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "helix");

        let all = RecallTool
            .execute(serde_json::json!({"key": "all"}), &mut ctx)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&all).unwrap();
        assert_eq!(parsed["editor"], "helix");
    }

    #[tokio::test]
    async fn recall_missing_key() {
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let out = RecallTool
            .execute(serde_json::json!({"key": "nope"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "No memory found for key: nope");
    }

    #[tokio::test]
    async fn reserved_key_is_rejected() {
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let err = RememberTool
            .execute(serde_json::json!({"key": "all", "value": "x"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(memory.is_empty().await);
    }
}

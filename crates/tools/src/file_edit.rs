//! File edit tool: exact-match replacement of the first occurrence.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::session::Action;
use ember_core::tool::{Tool, ToolContext};
use crate::guard::PathPolicy;

pub struct FileEditTool {
    policy: PathPolicy,
}

impl FileEditTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

/// Replace the first occurrence of `old` in `content`. `None` if absent.
pub fn replace_first(content: &str, old: &str, new: &str) -> Option<String> {
    if old.is_empty() || !content.contains(old) {
        return None;
    }
    Some(content.replacen(old, new, 1))
}

#[async_trait]
impl Tool for FileEditTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing the first exact occurrence of old_text with new_text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The file to edit" },
                "old_text": { "type": "string", "description": "Exact text to find" },
                "new_text": { "type": "string", "description": "Replacement text" }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let old_text = arguments["old_text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'old_text' argument".into()))?;
        let new_text = arguments["new_text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'new_text' argument".into()))?;

        let resolved = self.policy.check(self.name(), path)?;
        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::failed("edit_file", format!("Failed to read '{path}': {e}")))?;

        let updated = replace_first(&content, old_text, new_text)
            .ok_or_else(|| ToolError::failed("edit_file", format!("old_text not found in {path}")))?;

        tokio::fs::write(&resolved, updated)
            .await
            .map_err(|e| ToolError::failed("edit_file", format!("Failed to write '{path}': {e}")))?;

        ctx.record(Action::new("edited_file").with_path(path)).await;
        Ok(format!("Edited {path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::session::Session;
    use ember_memory::KvStore;

    #[test]
    fn replaces_only_the_first_match() {
        assert_eq!(replace_first("a b a", "a", "c").as_deref(), Some("c b a"));
        assert_eq!(replace_first("abc", "x", "y"), None);
        assert_eq!(replace_first("abc", "", "y"), None);
    }

    #[tokio::test]
    async fn edits_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cfg.txt"), "port = 80\nhost = a\n").unwrap();
        let tool = FileEditTool::new(PathPolicy::default().with_base(dir.path().to_path_buf()));

        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        tool.execute(
            serde_json::json!({"path": "cfg.txt", "old_text": "port = 80", "new_text": "port = 8080"}),
            &mut ctx,
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("cfg.txt")).unwrap(),
            "port = 8080\nhost = a\n"
        );
    }

    #[tokio::test]
    async fn missing_old_text_fails_and_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cfg.txt"), "port = 80").unwrap();
        let tool = FileEditTool::new(PathPolicy::default().with_base(dir.path().to_path_buf()));

        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        let err = tool
            .execute(
                serde_json::json!({"path": "cfg.txt", "old_text": "port = 81", "new_text": "x"}),
                &mut ctx,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not found"));
        assert_eq!(std::fs::read_to_string(dir.path().join("cfg.txt")).unwrap(), "port = 80");
    }
}

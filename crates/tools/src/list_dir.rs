//! Directory listing tool.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::tool::{Tool, ToolContext};
use crate::guard::PathPolicy;

pub struct ListDirTool {
    policy: PathPolicy,
}

impl ListDirTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of a directory. Defaults to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (optional)"
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let path = arguments["path"].as_str().unwrap_or(".");
        let resolved = self.policy.check(self.name(), path)?;

        let mut reader = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| ToolError::failed("list_dir", format!("Failed to list '{path}': {e}")))?;

        let mut lines = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::failed("list_dir", e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            let marker = if is_dir { "[DIR]" } else { "[FILE]" };
            lines.push(format!("{marker} {}", entry.file_name().to_string_lossy()));
        }

        if lines.is_empty() {
            return Ok("(empty directory)".into());
        }
        lines.sort();
        Ok(lines.join("\n"))
    }
}

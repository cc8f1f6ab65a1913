//! File write tool: write or create files with path validation.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::session::Action;
use ember_core::tool::{Tool, ToolContext};
use crate::guard::PathPolicy;

pub struct FileWriteTool {
    policy: PathPolicy,
}

impl FileWriteTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file and any missing parent directories, \
         overwrites the file if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
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
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = self.policy.check(self.name(), path)?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Err(ToolError::failed(
                "write_file",
                format!("Failed to create directory: {e}"),
            ));
        }

        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| ToolError::failed("write_file", format!("Failed to write file: {e}")))?;

        ctx.session.last_created_path = Some(path.to_string());
        ctx.record(Action::new("created_file").with_path(path)).await;

        Ok(format!("Successfully wrote {} bytes to {path}", content.len()))
    }
}

//! File read tool: read file contents with path validation.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::tool::{Tool, ToolContext, truncate_chars};
use tokio::io::AsyncReadExt;
use crate::guard::PathPolicy;

/// UTF-8 worst case: reading this many bytes per shown char is always enough.
const BYTES_PER_CHAR: u64 = 4;

pub struct FileReadTool {
    policy: PathPolicy,
    max_chars: usize,
}

impl FileReadTool {
    pub fn new(policy: PathPolicy, max_chars: usize) -> Self {
        Self { policy, max_chars }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let resolved = self.policy.check(self.name(), path)?;

        let read_err = |e: std::io::Error| {
            ToolError::failed("read_file", format!("Failed to read '{path}': {e}"))
        };
        let file = tokio::fs::File::open(&resolved).await.map_err(read_err)?;
        let size = file.metadata().await.map_err(read_err)?.len();

        // Never pull more of the file into memory than can be shown
        let limit = (self.max_chars as u64).saturating_mul(BYTES_PER_CHAR);
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes).await.map_err(read_err)?;
        let content = String::from_utf8_lossy(&bytes);

        let shown = truncate_chars(&content, self.max_chars);
        if (bytes.len() as u64) < size {
            Ok(format!(
                "{shown}\n[truncated: showing {} chars of a {size}-byte file]",
                shown.chars().count()
            ))
        } else if shown.len() < content.len() {
            Ok(format!(
                "{shown}\n[truncated: showing {} of {} chars]",
                self.max_chars,
                content.chars().count()
            ))
        } else {
            Ok(content.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::session::Session;
    use ember_memory::KvStore;

    #[tokio::test]
    async fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "hello world").unwrap();

        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        let out = FileReadTool::new(PathPolicy::default(), 1000)
            .execute(serde_json::json!({"path": file.to_str().unwrap()}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn long_file_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "x".repeat(50)).unwrap();

        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        let out = FileReadTool::new(PathPolicy::default(), 20)
            .execute(serde_json::json!({"path": file.to_str().unwrap()}), &mut ctx)
            .await
            .unwrap();
        assert!(out.starts_with(&format!("{}\n[truncated", "x".repeat(20))));
        assert!(out.contains("20 of 50"));
    }

    #[tokio::test]
    async fn huge_file_is_read_only_up_to_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("huge.log");
        std::fs::write(&file, "y".repeat(5_000_000)).unwrap();

        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        let out = FileReadTool::new(PathPolicy::default(), 10)
            .execute(serde_json::json!({"path": file.to_str().unwrap()}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(
            out,
            "yyyyyyyyyy\n[truncated: showing 10 chars of a 5000000-byte file]"
        );
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        let err = FileReadTool::new(PathPolicy::default(), 10)
            .execute(serde_json::json!({"path": "/definitely/not/here.txt"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("read_file failed"));
    }

    #[tokio::test]
    async fn forbidden_path_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("secret");
        std::fs::create_dir(&secret).unwrap();
        std::fs::write(secret.join("key"), "k").unwrap();

        let policy = PathPolicy::new(vec![secret.to_str().unwrap().to_string()]);
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);
        let err = FileReadTool::new(policy, 10)
            .execute(
                serde_json::json!({"path": secret.join("key").to_str().unwrap()}),
                &mut ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
    }
}

//! `read_self` / `upgrade_self`: let the agent inspect and patch its own
//! editable artifacts.
//!
//! Only files named in the upgrade allow-list, living directly in the data
//! directory, can be touched. The running executable is never a target.
//! Every edit writes `<file>.backup` first and is appended to a bounded
//! upgrade log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ember_core::error::ToolError;
use ember_core::session::Action;
use ember_core::tool::{Tool, ToolContext};
use ember_memory::JsonStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const UPGRADE_LOG_CAP: usize = 50;
pub const UPGRADE_LOG_FILE: &str = "upgrades.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpgradeRecord {
    pub file: String,
    pub reason: String,
    pub time: DateTime<Utc>,
}

/// Where upgrades may land and whether they are enabled at all.
pub struct UpgradePolicy {
    enabled: bool,
    root: PathBuf,
    targets: Vec<String>,
    log: JsonStore<Vec<UpgradeRecord>>,
}

impl UpgradePolicy {
    pub fn new(enabled: bool, root: PathBuf, targets: Vec<String>) -> Self {
        let log = JsonStore::open(root.join(UPGRADE_LOG_FILE), Vec::new());
        Self {
            enabled,
            root,
            targets,
            log,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Upgrade history, oldest first.
    pub async fn history(&self) -> Vec<UpgradeRecord> {
        self.log.snapshot().await
    }

    /// Map an allow-listed file name to its path under the data directory.
    pub fn resolve(&self, tool: &str, file: &str) -> Result<PathBuf, ToolError> {
        if !self.targets.iter().any(|t| t == file) {
            return Err(ToolError::PermissionDenied {
                tool_name: tool.into(),
                reason: format!("'{file}' is not upgradable. Options: {}", self.targets.join(", ")),
            });
        }
        let path = self.root.join(file);
        if is_current_exe(&path) {
            return Err(ToolError::PermissionDenied {
                tool_name: tool.into(),
                reason: "the running executable cannot be modified".into(),
            });
        }
        Ok(path)
    }

    async fn log(&self, record: UpgradeRecord) -> Result<(), ToolError> {
        self.log
            .update(|log| {
                log.push(record);
                if log.len() > UPGRADE_LOG_CAP {
                    let excess = log.len() - UPGRADE_LOG_CAP;
                    log.drain(..excess);
                }
            })
            .await
            .map_err(|e| ToolError::failed("upgrade_self", e))
    }
}

fn is_current_exe(path: &Path) -> bool {
    let Ok(exe) = std::env::current_exe() else {
        return false;
    };
    match (exe.canonicalize(), path.canonicalize()) {
        (Ok(exe), Ok(path)) => exe == path,
        _ => exe == path,
    }
}

pub struct ReadSelfTool {
    policy: Arc<UpgradePolicy>,
}

impl ReadSelfTool {
    pub fn new(policy: Arc<UpgradePolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ReadSelfTool {
    fn name(&self) -> &str {
        "read_self"
    }

    fn description(&self) -> &str {
        "Read one of your own editable files (persona, recipes) before improving it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file": {
                    "type": "string",
                    "description": format!("One of: {}", self.policy.targets().join(", "))
                }
            },
            "required": ["file"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let file = arguments["file"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file' argument".into()))?;
        let path = self.policy.resolve(self.name(), file)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(format!("{file} does not exist yet"))
            }
            Err(e) => Err(ToolError::failed("read_self", e)),
        }
    }
}

pub struct UpgradeSelfTool {
    policy: Arc<UpgradePolicy>,
}

impl UpgradeSelfTool {
    pub fn new(policy: Arc<UpgradePolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for UpgradeSelfTool {
    fn name(&self) -> &str {
        "upgrade_self"
    }

    fn description(&self) -> &str {
        "Improve one of your own editable files by replacing exact text. A backup is saved \
         first. Changes apply on the next start."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file": {
                    "type": "string",
                    "description": format!("One of: {}", self.policy.targets().join(", "))
                },
                "old_text": { "type": "string", "description": "Exact text to replace" },
                "new_text": { "type": "string", "description": "Replacement text" },
                "reason": { "type": "string", "description": "Why this change is being made" }
            },
            "required": ["file", "old_text", "new_text", "reason"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        if !self.policy.enabled() {
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: "self-upgrade is disabled (auto_upgrade = false)".into(),
            });
        }

        let field = |name: &str| {
            arguments[name]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{name}' argument")))
        };
        let file = field("file")?;
        let old_text = field("old_text")?;
        let new_text = field("new_text")?;
        let reason = field("reason")?;

        let path = self.policy.resolve(self.name(), file)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::failed("upgrade_self", format!("Failed to read {file}: {e}")))?;

        let updated = crate::file_edit::replace_first(&content, old_text, new_text).ok_or_else(|| {
            ToolError::failed(
                "upgrade_self",
                "Could not find exact text to replace. Check whitespace and formatting.",
            )
        })?;

        let mut backup = path.clone().into_os_string();
        backup.push(".backup");
        tokio::fs::write(&backup, &content)
            .await
            .map_err(|e| ToolError::failed("upgrade_self", format!("Failed to write backup: {e}")))?;
        tokio::fs::write(&path, updated)
            .await
            .map_err(|e| ToolError::failed("upgrade_self", format!("Failed to write {file}: {e}")))?;

        info!(file = %file, reason = %reason, "Self-upgrade applied");
        self.policy
            .log(UpgradeRecord {
                file: file.to_string(),
                reason: reason.to_string(),
                time: Utc::now(),
            })
            .await?;
        ctx.record(Action::new("self_upgrade").with_path(file).with_detail(reason))
            .await;

        Ok(format!(
            "Successfully upgraded {file}. Backup saved. Restart to apply changes."
        ))
    }
}

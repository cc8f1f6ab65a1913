//! `get_context`: what this conversation has been doing so far.

use async_trait::async_trait;
use chrono::Utc;
use ember_core::error::ToolError;
use ember_core::session::Session;
use ember_core::tool::{Tool, ToolContext};

const RECENT_ACTIONS: usize = 10;
const RECENT_ERRORS: usize = 5;

pub struct ContextTool;

/// Session activity as a JSON document.
pub fn session_context(session: &Session) -> serde_json::Value {
    let skip = session.short_term.len().saturating_sub(RECENT_ACTIONS);
    let actions: Vec<_> = session.short_term.iter().skip(skip).collect();
    let errors: Vec<_> = session.errors.last(RECENT_ERRORS).collect();
    let uptime = (Utc::now() - session.started_at).num_seconds().max(0);

    serde_json::json!({
        "last_created_path": session.last_created_path,
        "recent_actions": actions,
        "recent_errors": errors,
        "session_uptime": format!("{}m {}s", uptime / 60, uptime % 60),
        "total_tokens": session.total_tokens,
        "total_cost": format!("${:.4}", session.total_cost),
    })
}

#[async_trait]
impl Tool for ContextTool {
    fn name(&self) -> &str {
        "get_context"
    }

    fn description(&self) -> &str {
        "Get the current session context: recent actions, the last created path, recent \
         errors and token usage. Use it to resolve references like \"that folder\"."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        serde_json::to_string_pretty(&session_context(ctx.session))
            .map_err(|e| ToolError::failed("get_context", e))
    }
}

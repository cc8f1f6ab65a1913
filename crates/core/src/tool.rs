//! Tool trait and registry: the capability interface the model acts through.
//!
//! The registry is the single source of truth for the tool catalog: the
//! definitions sent to the model are produced from whatever is registered.
//! Dispatch never fails as a fault. Unknown names, malformed payloads,
//! timeouts and executor errors all come back as a [`ToolOutcome`] whose
//! output starts with [`FAILURE_MARKER`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::memory::KeyValueMemory;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;
use crate::schema;
use crate::session::{Action, Session};

/// Every failed dispatch renders as a string starting with this.
pub const FAILURE_MARKER: &str = "Error";

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 50_000;

const TRUNCATION_NOTICE: &str = "\n[output truncated]";

/// What a tool sees of the running conversation.
pub struct ToolContext<'a> {
    pub session: &'a mut Session,
    pub memory: &'a dyn KeyValueMemory,
}

impl<'a> ToolContext<'a> {
    pub fn new(session: &'a mut Session, memory: &'a dyn KeyValueMemory) -> Self {
        Self { session, memory }
    }

    /// Append an action to the session's short-term context.
    pub async fn record(&mut self, action: Action) {
        self.session.record(action, self.memory).await;
    }
}

/// The core Tool trait.
///
/// Implementations are registered once at startup. `validate` runs before
/// `execute`, so executors may assume required fields are present and
/// correctly typed.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "bash", "write_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Structural check of the argument payload.
    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        schema::validate(&self.parameters_schema(), arguments).map_err(ToolError::InvalidArguments)
    }

    /// Run the tool. `Ok` is a success string; `Err` is rendered by the
    /// registry with the failure marker.
    async fn execute(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The result of one dispatched call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub output: String,
    pub success: bool,
    pub duration_ms: u64,
}

impl ToolOutcome {
    /// Success is decided from the rendered string alone.
    pub fn is_failure_text(output: &str) -> bool {
        output.starts_with(FAILURE_MARKER)
    }
}

/// Hard limits applied to every dispatch.
#[derive(Debug, Clone, Copy)]
pub struct ToolLimits {
    pub timeout: Duration,
    pub max_output_chars: usize,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TOOL_TIMEOUT,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }
}

/// A registry of available tools, keyed by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
    limits: ToolLimits,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            limits: ToolLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ToolLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> ToolLimits {
        self.limits
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// The catalog sent to the model, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call exactly as the model produced it (raw argument text).
    pub async fn dispatch(&self, call: &MessageToolCall, ctx: &mut ToolContext<'_>) -> ToolOutcome {
        match parse_arguments(&call.arguments) {
            Ok(arguments) => self.execute(&call.id, &call.name, arguments, ctx).await,
            Err(e) => finish(&call.id, &call.name, Value::Null, Err(e), Instant::now(), self.limits),
        }
    }

    /// Dispatch a call whose arguments are already structured.
    pub async fn execute(
        &self,
        call_id: &str,
        name: &str,
        arguments: Value,
        ctx: &mut ToolContext<'_>,
    ) -> ToolOutcome {
        let start = Instant::now();
        let result = self.run(name, &arguments, ctx).await;
        finish(call_id, name, arguments, result, start, self.limits)
    }

    async fn run(&self, name: &str, arguments: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.validate(arguments)?;

        match tokio::time::timeout(self.limits.timeout, tool.execute(arguments.clone(), ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: self.limits.timeout.as_secs(),
            }),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(format!("malformed JSON: {e}")))
}

fn finish(
    call_id: &str,
    name: &str,
    arguments: Value,
    result: Result<String, ToolError>,
    start: Instant,
    limits: ToolLimits,
) -> ToolOutcome {
    let output = match result {
        Ok(text) => cap_output(text, limits.max_output_chars),
        Err(e) => {
            warn!(tool = %name, "Tool failed: {e}");
            format!("{FAILURE_MARKER}: {e}")
        }
    };
    let duration_ms = start.elapsed().as_millis() as u64;
    let success = !ToolOutcome::is_failure_text(&output);
    debug!(tool = %name, success, duration_ms, "Tool dispatched");

    ToolOutcome {
        call_id: call_id.to_string(),
        tool_name: name.to_string(),
        arguments,
        output,
        success,
        duration_ms,
    }
}

/// The longest prefix of `text` holding at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn cap_output(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    format!("{}{TRUNCATION_NOTICE}", truncate_chars(&text, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::test_support::MapMemory;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes `text` and counts how often it actually ran.
    struct EchoTool {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            ctx.record(Action::new("echo").with_detail(&text)).await;
            if text == "boom" {
                return Err(ToolError::failed("echo", "exploded"));
            }
            Ok(text)
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str { "slow" }
        fn description(&self) -> &str { "Sleeps forever" }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: Value, _ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("woke".into())
        }
    }

    fn registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool { runs: runs.clone() }));
        (registry, runs)
    }

    fn call(name: &str, arguments: &str) -> MessageToolCall {
        MessageToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let (registry, _) = registry();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn catalog_mirrors_registered_set() {
        let (mut registry, _) = registry();
        registry.register(Box::new(SlowTool));
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "slow"]);
    }

    #[tokio::test]
    async fn dispatch_success() {
        let (registry, runs) = registry();
        let memory = MapMemory::default();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let outcome = registry.dispatch(&call("echo", r#"{"text":"hello world"}"#), &mut ctx).await;
        assert!(outcome.success);
        assert_eq!(outcome.output, "hello world");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(session.short_term.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failure_string() {
        let (registry, _) = registry();
        let memory = MapMemory::default();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let outcome = registry.dispatch(&call("teleport", "{}"), &mut ctx).await;
        assert!(!outcome.success);
        assert_eq!(outcome.output, "Error: Unknown tool: teleport");
    }

    #[tokio::test]
    async fn schema_violation_never_reaches_executor() {
        let (registry, runs) = registry();
        let memory = MapMemory::default();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        for raw in [r#"{"text": 42}"#, "{}", "not json at all", "[1,2]"] {
            let outcome = registry.dispatch(&call("echo", raw), &mut ctx).await;
            assert!(!outcome.success, "{raw} should fail");
            assert!(outcome.output.starts_with("Error: Invalid arguments"), "{}", outcome.output);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(session.short_term.is_empty());
    }

    #[tokio::test]
    async fn executor_error_carries_marker() {
        let (registry, _) = registry();
        let memory = MapMemory::default();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let outcome = registry.dispatch(&call("echo", r#"{"text":"boom"}"#), &mut ctx).await;
        assert!(!outcome.success);
        assert_eq!(outcome.output, "Error: echo failed: exploded");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let mut registry = ToolRegistry::new().with_limits(ToolLimits {
            timeout: Duration::from_secs(5),
            max_output_chars: 100,
        });
        registry.register(Box::new(SlowTool));
        let memory = MapMemory::default();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let outcome = registry.dispatch(&call("slow", ""), &mut ctx).await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("timed out after 5s"));
    }

    #[tokio::test]
    async fn long_output_is_truncated() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new().with_limits(ToolLimits {
            timeout: DEFAULT_TOOL_TIMEOUT,
            max_output_chars: 10,
        });
        registry.register(Box::new(EchoTool { runs }));
        let memory = MapMemory::default();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let text = "é".repeat(25);
        let args = serde_json::json!({ "text": text }).to_string();
        let outcome = registry.dispatch(&call("echo", &args), &mut ctx).await;
        assert!(outcome.success);
        assert!(outcome.output.starts_with(&"é".repeat(10)));
        assert!(outcome.output.ends_with("[output truncated]"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}

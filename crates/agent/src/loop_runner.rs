//! The agent reasoning loop implementation.

use crate::bookkeeping::{archive_text, should_archive, turn_events};
use crate::gateway::ModelGateway;
use crate::prompt::PromptBuilder;
use crate::stores::Stores;
use chrono::Utc;
use ember_core::event::DomainEvent;
use ember_core::message::{Message, Transcript};
use ember_core::session::Session;
use ember_core::tool::{ToolContext, ToolRegistry, truncate_chars};
use ember_persona::MoodSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

/// Tool results kept in the reply are cut to this many characters.
pub const RESULT_EXCERPT_CHARS: usize = 2000;

pub const INCOMPLETE_REPLY: &str = "Reached maximum iterations. Task may be incomplete.";

/// How a loop invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The model answered without asking for tools
    Complete,
    /// The iteration cap was hit first
    Incomplete,
    /// A gateway call failed; nothing was persisted
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTool {
    pub tool: String,
    pub args: serde_json::Value,
    pub result: String,
    pub success: bool,
}

/// Everything the caller learns about one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub reply: String,
    pub tools_executed: Vec<ExecutedTool>,
    /// Gateway calls made
    pub iterations: u32,
    pub model: String,
    pub tokens: u64,
    pub cost: f64,
    pub mood: MoodSnapshot,
    pub outcome: LoopOutcome,
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    gateway: ModelGateway,

    tools: Arc<ToolRegistry>,

    /// Process-wide stores shared by every conversation
    stores: Arc<Stores>,

    prompt: PromptBuilder,

    /// Maximum gateway calls per user message
    max_iterations: u32,
}

impl AgentLoop {
    pub fn new(gateway: ModelGateway, tools: Arc<ToolRegistry>, stores: Arc<Stores>) -> Self {
        Self {
            gateway,
            tools,
            stores,
            prompt: PromptBuilder::new(3),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Archive excerpts placed in the system prompt.
    pub fn with_recall_excerpts(mut self, n: usize) -> Self {
        self.prompt = PromptBuilder::new(n);
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.stores
    }

    /// Handle one user message.
    ///
    /// Tool calls in a response run one at a time in the order requested.
    /// A gateway failure ends the invocation at once and leaves the mood,
    /// profile, archive and history untouched.
    pub async fn run(&self, message: &str, model: Option<&str>, session: &mut Session) -> AgentReply {
        let model = self.gateway.resolve_model(model);
        info!(conversation_id = %session.id, model = %model, "Processing message");

        let definitions = self.tools.definitions();
        let system_prompt = self
            .prompt
            .build(&self.stores, &definitions, session, message)
            .await;

        let mut transcript = Transcript::new();
        transcript.push(Message::system(system_prompt));
        transcript.push(Message::user(message));

        let mut executed: Vec<ExecutedTool> = Vec::new();
        let mut iterations = 0u32;
        let mut answered_by = model.clone();
        let mut tokens = 0u64;
        let mut cost = 0.0;

        let (reply, outcome) = loop {
            if iterations >= self.max_iterations {
                warn!(conversation_id = %session.id, iterations, "Max iterations reached");
                break (INCOMPLETE_REPLY.to_string(), LoopOutcome::Incomplete);
            }
            iterations += 1;
            debug!(conversation_id = %session.id, iteration = iterations, "Agent loop iteration");

            let completion = match self
                .gateway
                .complete(&transcript, &definitions, &model, session)
                .await
            {
                Ok(completion) => completion,
                Err(e) => {
                    let message = e.to_string();
                    error!(conversation_id = %session.id, iteration = iterations, "Gateway call failed: {message}");
                    session.log_error(message.clone());
                    self.stores.events.publish(DomainEvent::ErrorOccurred {
                        context: "model_gateway".into(),
                        error_message: message.clone(),
                        timestamp: Utc::now(),
                    });
                    return AgentReply {
                        reply: format!("Error: {message}"),
                        tools_executed: executed,
                        iterations,
                        model: answered_by,
                        tokens,
                        cost,
                        mood: self.stores.mood.snapshot().await,
                        outcome: LoopOutcome::Failed,
                    };
                }
            };

            tokens += u64::from(completion.usage.total_tokens);
            cost += completion.cost;
            answered_by = completion.model.clone();

            if !completion.wants_tools() {
                break (completion.message.content, LoopOutcome::Complete);
            }

            let calls = completion.message.tool_calls.clone();
            debug!(tool_count = calls.len(), "Executing tool calls");
            transcript.push(completion.message);

            for call in &calls {
                let outcome = {
                    let mut ctx = ToolContext::new(session, self.stores.memory.as_ref());
                    self.tools.dispatch(call, &mut ctx).await
                };
                info!(
                    tool = %outcome.tool_name,
                    success = outcome.success,
                    duration_ms = outcome.duration_ms,
                    "Tool executed"
                );
                self.stores.events.publish(DomainEvent::ToolExecuted {
                    tool_name: outcome.tool_name.clone(),
                    success: outcome.success,
                    duration_ms: outcome.duration_ms,
                    timestamp: Utc::now(),
                });

                transcript.push(Message::tool_result(&call.id, &outcome.output));
                executed.push(ExecutedTool {
                    tool: outcome.tool_name,
                    args: outcome.arguments,
                    result: truncate_chars(&outcome.output, RESULT_EXCERPT_CHARS).to_string(),
                    success: outcome.success,
                });
            }
        };

        let mood = self.finish_turn(message, &reply, &executed, session).await;

        self.stores.events.publish(DomainEvent::ResponseGenerated {
            conversation_id: session.id.to_string(),
            model: answered_by.clone(),
            iterations,
            tokens_used: tokens,
            timestamp: Utc::now(),
        });
        info!(
            conversation_id = %session.id,
            iterations,
            tools = executed.len(),
            tokens,
            outcome = ?outcome,
            "Turn finished"
        );

        AgentReply {
            reply,
            tools_executed: executed,
            iterations,
            model: answered_by,
            tokens,
            cost,
            mood,
            outcome,
        }
    }

    /// Persist what the turn changed. Store failures are logged and skipped;
    /// the reply has already been produced.
    async fn finish_turn(
        &self,
        message: &str,
        reply: &str,
        executed: &[ExecutedTool],
        session: &mut Session,
    ) -> MoodSnapshot {
        let stores = &self.stores;
        let _turn = stores.lock_turn().await;

        let signals = stores.profile.observe(message).await.unwrap_or_else(|e| {
            warn!("Could not update user profile: {e}");
            Default::default()
        });

        session.turns += 1;
        let events = turn_events(message, executed, signals, session.turns);
        let mood = match stores.mood.apply_all(&events).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not persist mood: {e}");
                stores.mood.snapshot().await
            }
        };

        if should_archive(message, executed)
            && let Err(e) = stores.archive.add(&archive_text(message, executed), "conversation").await
        {
            warn!("Could not archive turn: {e}");
        }

        if let Err(e) = stores.history.append_turn(message, reply, executed.len()).await {
            warn!("Could not append history: {e}");
        }

        let succeeded: Vec<String> = executed
            .iter()
            .filter(|t| t.success)
            .map(|t| t.tool.clone())
            .collect();
        if let Err(e) = stores.mood.record_turn(&succeeded, executed.len()).await {
            warn!("Could not update self-model: {e}");
        }

        mood
    }
}

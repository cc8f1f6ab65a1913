//! The agent loop, the heart of Ember.
//!
//! The agent follows a **Plan → Act → Observe** cycle:
//!
//! 1. **Receive** a user message
//! 2. **Build the prompt** (identity, tool catalog, memory, mood, archive recall)
//! 3. **Call the model** through the [`ModelGateway`]
//! 4. **If tool calls**: run them in order, append results, go back to step 3
//! 5. **If text**: update mood, profile, archive and history, then reply
//!
//! The loop stops at the first text-only response, at the iteration cap,
//! or at the first gateway failure.

pub mod bookkeeping;
pub mod gateway;
pub mod loop_runner;
pub mod prompt;
pub mod recipe;
pub mod runtime;
pub mod stores;

#[cfg(test)]
mod test_helpers;

pub use gateway::{Completion, ModelGateway};
pub use loop_runner::{AgentLoop, AgentReply, ExecutedTool, LoopOutcome};
pub use prompt::{PromptBuilder, build_system_prompt};
pub use recipe::{AutomationSwitch, Recipe, RecipeBook, RecipeReport, run_recipe};
pub use runtime::Runtime;
pub use stores::Stores;

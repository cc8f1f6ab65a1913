//! Scripted recipes: fixed tool sequences run without the model.
//!
//! A running recipe checks its [`AutomationSwitch`] before every step, which
//! is the only way to stop automation once it has started. Recipes are kept
//! in `recipes.json` in the data directory.

use chrono::{DateTime, Utc};
use ember_core::error::StoreError;
use ember_core::memory::KeyValueMemory;
use ember_core::session::{AutomationRecord, Session};
use ember_core::tool::{ToolContext, ToolRegistry, truncate_chars};
use ember_memory::JsonStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

pub const RECIPES_FILE: &str = "recipes.json";

/// Created by `ember estop`, removed by `ember estop --resume`.
pub const STOP_FILE: &str = "automation.stop";

const STEP_RESULT_CHARS: usize = 200;

fn default_delay_ms() -> u64 {
    500
}

fn default_args() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub tool: String,
    #[serde(default = "default_args")]
    pub args: serde_json::Value,
    /// Pause after the step
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
    #[serde(default)]
    pub times_used: u64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl Recipe {
    /// Read a single recipe from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| StoreError::Serialize {
            what: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeList {
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

/// The persisted recipe collection.
pub struct RecipeBook {
    store: JsonStore<RecipeList>,
}

impl RecipeBook {
    pub fn open(path: PathBuf) -> Self {
        Self {
            store: JsonStore::open(path, RecipeList::default()),
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            store: JsonStore::ephemeral(RecipeList::default()),
        }
    }

    pub async fn list(&self) -> Vec<Recipe> {
        self.store.read(|list| list.recipes.clone()).await
    }

    /// Look a recipe up by id, then by name.
    pub async fn find(&self, id_or_name: &str) -> Option<Recipe> {
        self.store
            .read(|list| {
                list.recipes
                    .iter()
                    .find(|r| r.id == id_or_name)
                    .or_else(|| list.recipes.iter().find(|r| r.name == id_or_name))
                    .cloned()
            })
            .await
    }

    /// Store a recipe, assigning an id and creation time when missing.
    pub async fn add(&self, mut recipe: Recipe) -> Result<Recipe, StoreError> {
        if recipe.id.is_empty() {
            recipe.id = Utc::now().timestamp_millis().to_string();
        }
        recipe.created.get_or_insert_with(Utc::now);
        let stored = recipe.clone();
        self.store.update(move |list| list.recipes.push(stored)).await?;
        Ok(recipe)
    }

    pub async fn mark_used(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.store
            .update(move |list| {
                if let Some(recipe) = list.recipes.iter_mut().find(|r| r.id == id) {
                    recipe.times_used += 1;
                }
            })
            .await
    }
}

/// Shared stop flag for running recipes.
///
/// With a stop file attached, the file's presence also counts as stopped,
/// so a separate process can halt automation.
#[derive(Debug, Clone, Default)]
pub struct AutomationSwitch {
    stopped: Arc<AtomicBool>,
    stop_file: Option<PathBuf>,
}

impl AutomationSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_file(mut self, path: PathBuf) -> Self {
        self.stop_file = Some(path);
        self
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst) || self.stop_file.as_deref().is_some_and(Path::exists)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub tool: String,
    pub success: bool,
    /// First 200 characters of the tool output
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeReport {
    pub recipe: String,
    pub steps: Vec<StepResult>,
    /// True if the switch halted the run before its last step
    pub stopped: bool,
}

impl RecipeReport {
    pub fn completed(&self) -> usize {
        self.steps.len()
    }
}

/// Run `recipe` step by step through `tools`.
pub async fn run_recipe(
    recipe: &Recipe,
    tools: &ToolRegistry,
    session: &mut Session,
    memory: &dyn KeyValueMemory,
    switch: &AutomationSwitch,
) -> RecipeReport {
    info!(recipe = %recipe.name, steps = recipe.steps.len(), "Running recipe");
    let mut steps = Vec::with_capacity(recipe.steps.len());
    let mut stopped = false;

    for (i, step) in recipe.steps.iter().enumerate() {
        if switch.is_stopped() {
            warn!(recipe = %recipe.name, completed = i, "Automation stopped");
            stopped = true;
            break;
        }

        let outcome = {
            let mut ctx = ToolContext::new(session, memory);
            let call_id = format!("recipe_{i}");
            tools.execute(&call_id, &step.tool, step.args.clone(), &mut ctx).await
        };
        session.automation_log.push(AutomationRecord {
            tool: step.tool.clone(),
            args: step.args.clone(),
            success: outcome.success,
            time: Utc::now(),
        });
        steps.push(StepResult {
            tool: step.tool.clone(),
            success: outcome.success,
            result: truncate_chars(&outcome.output, STEP_RESULT_CHARS).to_string(),
        });

        if step.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
        }
    }

    RecipeReport {
        recipe: recipe.name.clone(),
        steps,
        stopped,
    }
}

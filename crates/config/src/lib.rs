//! Configuration loading, validation, and persistence for Ember.
//!
//! Loads `~/.ember/config.toml` (or `$EMBER_CONFIG_DIR/config.toml`) with
//! environment variable overrides. Every field has a serde default, so a
//! missing file, a missing section, or a file that fails to parse all yield
//! a usable configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used when a request names none
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Gateway calls allowed per agent-loop run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Whether `upgrade_self` may edit its allow-listed artifacts
    #[serde(default = "default_true")]
    pub auto_upgrade: bool,

    /// Where the persistent stores live; defaults to the config dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// Task aliases ("code", "best", ...) to model ids
    #[serde(default = "default_model_aliases")]
    pub models: BTreeMap<String, String>,

    /// Per-model price overrides
    #[serde(default)]
    pub pricing: BTreeMap<String, PriceOverride>,
}

fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_iterations() -> u32 {
    15
}
fn default_true() -> bool {
    true
}

fn default_model_aliases() -> BTreeMap<String, String> {
    [
        ("chat", "openai/gpt-4o-mini"),
        ("code", "openai/gpt-4o"),
        ("best", "anthropic/claude-3.5-sonnet"),
        ("fast", "openai/gpt-4o-mini"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("max_iterations", &self.max_iterations)
            .field("auto_upgrade", &self.auto_upgrade)
            .field("data_dir", &self.data_dir)
            .field("provider", &self.provider)
            .field("memory", &self.memory)
            .field("tools", &self.tools)
            .field("models", &self.models)
            .field("pricing", &self.pricing)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as the `X-Title` header
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_app_name() -> String {
    "Ember".into()
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_name: default_app_name(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Short-term ring buffer size; half is evicted on overflow
    #[serde(default = "default_short_term_cap")]
    pub short_term_cap: usize,

    /// Archive high-water mark
    #[serde(default = "default_archive_cap")]
    pub archive_cap: usize,

    /// Oldest entries folded into one aggregate on compaction
    #[serde(default = "default_compaction_block")]
    pub compaction_block: usize,

    /// Messages kept in the conversation history file
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,

    #[serde(default = "default_mood_history_cap")]
    pub mood_history_cap: usize,

    /// Archive matches injected into the first transcript entry
    #[serde(default = "default_recall_excerpts")]
    pub recall_excerpts: usize,
}

fn default_short_term_cap() -> usize {
    100
}
fn default_archive_cap() -> usize {
    500
}
fn default_compaction_block() -> usize {
    100
}
fn default_history_retention() -> usize {
    200
}
fn default_mood_history_cap() -> usize {
    50
}
fn default_recall_excerpts() -> usize {
    3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_cap: default_short_term_cap(),
            archive_cap: default_archive_cap(),
            compaction_block: default_compaction_block(),
            history_retention: default_history_retention(),
            mood_history_cap: default_mood_history_cap(),
            recall_excerpts: default_recall_excerpts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Hard wall-clock limit for any single tool call
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Hard cap on any tool's returned text
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,

    #[serde(default = "default_max_read_chars")]
    pub max_read_chars: usize,

    #[serde(default = "default_http_max_chars")]
    pub http_max_chars: usize,

    /// Files `read_self` / `upgrade_self` may touch, relative to the data dir
    #[serde(default = "default_upgrade_targets")]
    pub upgrade_targets: Vec<String>,

    /// Paths no file tool may touch
    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: Vec<String>,
}

fn default_tool_timeout() -> u64 {
    120
}
fn default_max_output_chars() -> usize {
    50_000
}
fn default_max_read_chars() -> usize {
    100_000
}
fn default_http_max_chars() -> usize {
    50_000
}
fn default_upgrade_targets() -> Vec<String> {
    vec!["persona.toml".into(), "recipes.json".into()]
}
fn default_forbidden_paths() -> Vec<String> {
    vec![
        "/etc".into(),
        "/root/.ssh".into(),
        "/proc".into(),
        "/sys".into(),
        "~/.ssh".into(),
        "~/.gnupg".into(),
        "~/.aws".into(),
    ]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout(),
            max_output_chars: default_max_output_chars(),
            max_read_chars: default_max_read_chars(),
            http_max_chars: default_http_max_chars(),
            upgrade_targets: default_upgrade_targets(),
            forbidden_paths: default_forbidden_paths(),
        }
    }
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceOverride {
    pub input: f64,
    pub output: f64,
}

impl AppConfig {
    /// Load configuration from the default location with env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_path(&Self::config_path())
    }

    /// Like [`load`](Self::load), from an explicit file (`--config`).
    pub fn load_path(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Config at {} does not parse ({e}), using defaults", path.display());
                return Ok(Self::default());
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(key) = std::env::var("EMBER_API_KEY")
            .ok()
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            .filter(|k| !k.is_empty())
        {
            self.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("EMBER_MODEL") {
            self.default_model = model;
        }

        if let Some(n) = std::env::var("EMBER_MAX_ITERATIONS").ok().and_then(|v| v.parse().ok()) {
            self.max_iterations = n;
        }
    }

    /// Persist the whole document (used when switching models).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        match std::env::var("EMBER_CONFIG_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs_home().join(".ember"),
        }
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Directory holding the memory, archive, history, mood and profile files.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| Self::config_dir().join("data"))
    }

    /// Resolve a task alias ("code", "best") to a model id. Anything that is
    /// not an alias, and "default", pass through unchanged or to the default.
    pub fn resolve_model(&self, name: &str) -> String {
        if name.is_empty() || name == "default" {
            return self.default_model.clone();
        }
        self.models.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationError("max_iterations must be at least 1".into()));
        }

        if self.memory.short_term_cap < 2 {
            return Err(ConfigError::ValidationError("memory.short_term_cap must be at least 2".into()));
        }

        if self.memory.compaction_block < 2 || self.memory.compaction_block > self.memory.archive_cap {
            return Err(ConfigError::ValidationError(
                "memory.compaction_block must be between 2 and memory.archive_cap".into(),
            ));
        }

        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("tools.timeout_secs must be > 0".into()));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            auto_upgrade: true,
            data_dir: None,
            provider: ProviderConfig::default(),
            memory: MemoryConfig::default(),
            tools: ToolsConfig::default(),
            models: default_model_aliases(),
            pricing: BTreeMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

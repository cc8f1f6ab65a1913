//! Built-in tool implementations for Ember.
//!
//! Tools give the agent the ability to interact with the world: run shell
//! commands, read and edit files, search the web, call HTTP endpoints,
//! remember facts, and inspect or improve its own persona files.

pub mod awareness;
pub mod context;
pub mod file_edit;
pub mod file_read;
pub mod file_write;
pub mod guard;
pub mod http_request;
pub mod list_dir;
pub mod memory_tools;
pub mod self_upgrade;
pub mod shell;
pub mod web_search;

use ember_core::tool::{ToolLimits, ToolRegistry};
use ember_persona::{MoodTracker, ProfileTracker};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use guard::{DeletionGuard, PathPolicy};
pub use self_upgrade::{UpgradePolicy, UpgradeRecord};

/// Everything the built-in tools need from configuration.
pub struct ToolSettings {
    pub timeout: Duration,
    pub max_output_chars: usize,
    pub max_read_chars: usize,
    pub http_max_chars: usize,
    /// Relative paths in file tools and the shell's default cwd resolve here
    pub workdir: PathBuf,
    pub forbidden_paths: Vec<String>,
    /// Directories no shell command may delete (install dir, data dir)
    pub protected_roots: Vec<PathBuf>,
    pub upgrade: Arc<UpgradePolicy>,
}

/// Create a registry with every built-in tool, using the given limits.
///
/// Security defaults:
/// - File tools refuse `forbidden_paths` (e.g. `~/.ssh`)
/// - The shell refuses to delete any of `protected_roots` or their ancestors
/// - `upgrade_self` only touches allow-listed files in the data directory
pub fn default_registry(
    settings: ToolSettings,
    mood: Arc<MoodTracker>,
    profile: Arc<ProfileTracker>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new().with_limits(ToolLimits {
        timeout: settings.timeout,
        max_output_chars: settings.max_output_chars,
    });

    let paths = PathPolicy::new(settings.forbidden_paths.clone()).with_base(settings.workdir.clone());

    registry.register(Box::new(shell::ShellTool::new(
        DeletionGuard::new(settings.protected_roots.clone()),
        settings.timeout,
        settings.workdir.clone(),
        settings.max_output_chars,
    )));
    registry.register(Box::new(file_read::FileReadTool::new(
        paths.clone(),
        settings.max_read_chars,
    )));
    registry.register(Box::new(file_write::FileWriteTool::new(paths.clone())));
    registry.register(Box::new(file_edit::FileEditTool::new(paths.clone())));
    registry.register(Box::new(list_dir::ListDirTool::new(paths)));
    registry.register(Box::new(memory_tools::RememberTool));
    registry.register(Box::new(memory_tools::RecallTool));
    registry.register(Box::new(web_search::WebSearchTool::new(settings.timeout)));
    registry.register(Box::new(http_request::HttpRequestTool::new(
        settings.timeout,
        settings.http_max_chars,
    )));
    registry.register(Box::new(self_upgrade::ReadSelfTool::new(settings.upgrade.clone())));
    registry.register(Box::new(self_upgrade::UpgradeSelfTool::new(settings.upgrade)));
    registry.register(Box::new(context::ContextTool));
    registry.register(Box::new(awareness::SelfAwarenessTool::new(mood, profile.clone())));
    registry.register(Box::new(awareness::SetUserInfoTool::new(profile)));
    registry
}

pub mod agent;
pub mod estop;
pub mod memory;
pub mod onboard;
pub mod recipe;
pub mod status;

use ember_agent::{Runtime, Stores};
use ember_config::AppConfig;
use ember_core::event::EventBus;
use std::path::Path;
use std::sync::Arc;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_path(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

/// Full agent runtime rooted at the current directory.
pub fn build_runtime(config: &AppConfig) -> Result<Runtime, Box<dyn std::error::Error>> {
    let provider = ember_providers::build_from_config(config);
    let workdir = std::env::current_dir()?;
    Ok(Runtime::build(config, provider, workdir))
}

/// Just the persistent stores, for commands that never call the model.
pub fn open_stores(config: &AppConfig) -> Stores {
    Stores::open(&config.data_dir(), &config.memory, Arc::new(EventBus::default()))
}

//! `ember onboard`: First-time setup.

use super::CmdResult;
use ember_config::AppConfig;
use ember_persona::Identity;
use ember_persona::identity::PERSONA_FILE;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> CmdResult {
    let default_path = AppConfig::config_path();
    let config_path = config_path.unwrap_or(&default_path);

    println!("Ember: First-Time Setup");
    println!("========================\n");

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        AppConfig::default().save_to(config_path)?;
        println!("Created config at: {}", config_path.display());
    }

    let config = AppConfig::load_from(config_path)?;
    let data_dir = config.data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        println!("Created data directory: {}", data_dir.display());
    }

    let persona_path = data_dir.join(PERSONA_FILE);
    let identity = Identity::load_or_init(&persona_path);
    println!("Persona '{}' at: {}", identity.name, persona_path.display());

    if !config.has_api_key() {
        println!("\nNext steps:");
        println!("   1. Add api_key to {} or set OPENROUTER_API_KEY", config_path.display());
        println!("   2. Run: ember agent");
    }

    println!("\nSetup complete! Run `ember agent` to start chatting.\n");
    Ok(())
}

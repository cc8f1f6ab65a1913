//! `ember status`: Mood, relationship and store sizes.

use super::{CmdResult, load_config, open_stores};
use ember_agent::recipe::STOP_FILE;
use ember_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> CmdResult {
    let config = load_config(config_path)?;
    let stores = open_stores(&config);
    let record = stores.mood.record().await;
    let profile = stores.profile.profile().await;
    let data_dir = config.data_dir();

    println!("{} Status", stores.identity.name);
    println!("============");
    println!("  Config:       {}", AppConfig::config_path().display());
    println!("  Data dir:     {}", data_dir.display());
    println!("  Model:        {}", config.default_model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Self-upgrade: {}", if config.auto_upgrade { "enabled" } else { "disabled" });
    println!();
    println!("  Mood:         {} ({}% energy)", record.mood.current, record.mood.energy);
    println!("  Relationship: {}", profile.relationship_note());
    println!(
        "  Work:         {} tasks, {} messages, {} sessions",
        record.self_model.tasks_completed, record.stats.total_messages, record.stats.sessions
    );
    if let Some(top) = record.self_model.favorite_activities.first() {
        println!("  Favourite:    {} ({}x)", top.name, top.count);
    }
    println!();
    println!("  Memories:     {}", stores.memory.len().await);
    println!("  Archive:      {} entries", stores.archive.len().await);

    if data_dir.join(STOP_FILE).exists() {
        println!("\n  Automation is STOPPED (ember estop --resume to clear)");
    }
    Ok(())
}

//! `ember estop`: Halt running recipes.
//!
//! Recipes check for the stop file before every step, so this works across
//! processes.

use super::{CmdResult, load_config};
use ember_agent::recipe::STOP_FILE;
use std::path::{Path, PathBuf};

pub fn stop_file(data_dir: &Path) -> PathBuf {
    data_dir.join(STOP_FILE)
}

pub async fn run(config_path: Option<&Path>, resume: bool) -> CmdResult {
    let config = load_config(config_path)?;
    let data_dir = config.data_dir();
    let path = stop_file(&data_dir);

    if resume {
        if path.exists() {
            std::fs::remove_file(&path)?;
            println!("Automation stop released. Recipes may run again.");
        } else {
            println!("No automation stop active.");
        }
    } else {
        std::fs::create_dir_all(&data_dir)?;
        std::fs::write(&path, chrono::Utc::now().to_rfc3339())?;
        println!("AUTOMATION STOPPED");
        println!("   Running recipes halt before their next step.");
        println!();
        println!("   To resume: ember estop --resume");
    }

    Ok(())
}

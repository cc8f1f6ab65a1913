//! `ember memory`: Memory commands that never call the model.

use super::{CmdResult, load_config, open_stores};
use ember_core::memory::{KeyValueMemory, MemoryEntry, RECALL_ALL_KEY, recall_text};
use std::path::Path;

pub async fn recall(config_path: Option<&Path>, key: &str) -> CmdResult {
    let config = load_config(config_path)?;
    let stores = open_stores(&config);
    println!("{}", recall_text(stores.memory.as_ref(), key).await?);
    Ok(())
}

pub async fn remember(config_path: Option<&Path>, key: &str, value: &str) -> CmdResult {
    if key.trim().is_empty() || key == RECALL_ALL_KEY {
        return Err(format!("'{key}' cannot be used as a memory key").into());
    }
    let config = load_config(config_path)?;
    let stores = open_stores(&config);
    stores.memory.remember(MemoryEntry::explicit(key, value)).await?;
    println!("Remembered '{key}'");
    Ok(())
}

pub async fn search(config_path: Option<&Path>, query: &str) -> CmdResult {
    let config = load_config(config_path)?;
    let stores = open_stores(&config);

    println!("Searching the archive for: \"{query}\"");
    println!();

    let results = stores.archive.search(query).await;
    if results.is_empty() {
        println!("   No matching memories.");
    }
    for (i, entry) in results.iter().enumerate() {
        println!(
            "  {:>2}. [{}] {}",
            i + 1,
            entry.kind,
            entry.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("      {}", entry.content);
        if !entry.keywords.is_empty() {
            println!("      keywords: {}", entry.keywords.join(", "));
        }
    }
    Ok(())
}

pub async fn stats(config_path: Option<&Path>) -> CmdResult {
    let config = load_config(config_path)?;
    let stores = open_stores(&config);

    println!("Memory Statistics");
    println!("=================");
    println!("  Data dir:    {}", config.data_dir().display());
    println!("  Memories:    {}", stores.memory.len().await);
    println!(
        "  Archive:     {} / {} entries (compacts {} at a time)",
        stores.archive.len().await,
        config.memory.archive_cap,
        config.memory.compaction_block
    );
    println!(
        "  History:     {} / {} messages",
        stores.history.len().await,
        config.memory.history_retention
    );
    Ok(())
}

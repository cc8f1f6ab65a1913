//! `ember recipe`: Run, list and save scripted tool sequences.

use super::{CmdResult, build_runtime, load_config};
use ember_agent::recipe::RECIPES_FILE;
use ember_agent::{Recipe, RecipeBook, run_recipe};
use std::path::Path;
use tracing::warn;

pub async fn run(config_path: Option<&Path>, recipe: &str) -> CmdResult {
    let config = load_config(config_path)?;
    let runtime = build_runtime(&config)?;

    let file = Path::new(recipe);
    let (recipe, saved) = if file.is_file() {
        (Recipe::from_file(file)?, false)
    } else {
        let found = runtime
            .recipes
            .find(recipe)
            .await
            .ok_or_else(|| format!("Recipe not found: {recipe}"))?;
        (found, true)
    };

    let switch = runtime.switch.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            switch.stop();
        }
    });

    let mut session = runtime.new_session().await;
    let report = run_recipe(
        &recipe,
        runtime.agent.tools(),
        &mut session,
        runtime.stores.memory.as_ref(),
        &runtime.switch,
    )
    .await;

    for (i, step) in report.steps.iter().enumerate() {
        let mark = if step.success { "ok" } else { "failed" };
        println!("  {:>2}. {} [{mark}]", i + 1, step.tool);
        for line in step.result.lines() {
            println!("      {line}");
        }
    }
    if report.stopped {
        println!(
            "\nStopped after {} of {} steps.",
            report.completed(),
            recipe.steps.len()
        );
    } else {
        println!("\nRecipe '{}' finished ({} steps).", report.recipe, report.completed());
    }

    if saved && let Err(e) = runtime.recipes.mark_used(&recipe.id).await {
        warn!("Could not update recipe usage: {e}");
    }
    Ok(())
}

fn open_book(config_path: Option<&Path>) -> Result<RecipeBook, Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    Ok(RecipeBook::open(config.data_dir().join(RECIPES_FILE)))
}

pub async fn list(config_path: Option<&Path>) -> CmdResult {
    let recipes = open_book(config_path)?.list().await;

    if recipes.is_empty() {
        println!("No saved recipes. Add one with `ember recipe add <file.json>`.");
    }
    for recipe in recipes {
        println!(
            "  {}  {} ({} steps, used {}x)",
            recipe.id,
            recipe.name,
            recipe.steps.len(),
            recipe.times_used
        );
        if !recipe.description.is_empty() {
            println!("      {}", recipe.description);
        }
    }
    Ok(())
}

pub async fn add(config_path: Option<&Path>, file: &Path) -> CmdResult {
    let recipe = open_book(config_path)?.add(Recipe::from_file(file)?).await?;
    println!("Saved recipe '{}' with id {}", recipe.name, recipe.id);
    Ok(())
}

//! `ember agent`: Interactive or single-message chat mode.

use super::{CmdResult, build_runtime, load_config};
use ember_agent::{AgentReply, LoopOutcome};
use ember_config::AppConfig;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config_path: Option<&Path>, message: Option<String>, model: Option<String>) -> CmdResult {
    let config = load_config(config_path)?;

    // Check for API key early: give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY=sk-or-v1-...   (recommended)");
        eprintln!("    EMBER_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let runtime = build_runtime(&config)?;
    let mut session = runtime.new_session().await;
    let model = model.as_deref();

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = runtime.agent.run(&msg, model, &mut session).await;
        eprint!("\r              \r");
        print_reply(&reply);
        if reply.outcome == LoopOutcome::Failed {
            return Err(reply.reply.into());
        }
        return Ok(());
    }

    let identity = &runtime.stores.identity;
    println!();
    println!("  {}: interactive mode", identity.name);
    println!();
    println!("  Model:     {}", runtime.agent.gateway().resolve_model(model));
    println!("  Tools:     {}", runtime.agent.tools().names().join(", "));
    println!("  Data:      {}", config.data_dir().display());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let reply = runtime.agent.run(line, model, &mut session).await;
        eprint!("\r     \r");
        println!();
        print_reply(&reply);
        println!();
    }

    println!();
    println!(
        "  Session: {} turns, {} tokens, ${:.4}",
        session.turns, session.total_tokens, session.total_cost
    );
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn print_reply(reply: &AgentReply) {
    for tool in &reply.tools_executed {
        let mark = if tool.success { "ok" } else { "failed" };
        println!("  [{}] {mark}", tool.tool);
    }
    for line in reply.reply.lines() {
        println!("  Ember > {line}");
    }
    println!(
        "  ({} iterations, {} tokens, ${:.4}, mood: {} {}%)",
        reply.iterations, reply.tokens, reply.cost, reply.mood.label, reply.mood.energy
    );
}

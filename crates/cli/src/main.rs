//! Ember CLI, the main entry point.
//!
//! Commands:
//! - `onboard`  Write a default config and persona
//! - `agent`    Interactive chat or single-message mode
//! - `memory`   Recall, remember and search without the model
//! - `recipe`   Run scripted tool sequences
//! - `status`   Mood, relationship and store sizes
//! - `estop`    Stop (or resume) running automation

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ember", about = "Ember: a tool-using agent with layered memory", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Config file to use instead of ~/.ember/config.toml
    #[arg(long, global = true, env = "EMBER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and data directory
    Onboard,

    /// Chat with the agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Model id or alias (chat, code, best, fast)
        #[arg(long)]
        model: Option<String>,
    },

    /// Inspect and edit memory directly
    Memory {
        #[command(subcommand)]
        action: MemoryCommand,
    },

    /// Scripted tool sequences
    Recipe {
        #[command(subcommand)]
        action: RecipeCommand,
    },

    /// Show agent status
    Status,

    /// Halt running recipes
    Estop {
        /// Clear the stop instead
        #[arg(long)]
        resume: bool,
    },
}

#[derive(Subcommand)]
enum MemoryCommand {
    /// Print one memory, or `all`
    Recall { key: String },
    /// Store a memory
    Remember { key: String, value: String },
    /// Keyword search over the long-term archive
    Search { query: String },
    /// Store sizes
    Stats,
}

#[derive(Subcommand)]
enum RecipeCommand {
    /// Run a saved recipe by id or name, or a recipe JSON file
    Run { recipe: String },
    /// List saved recipes
    List,
    /// Save a recipe from a JSON file
    Add { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "ember=debug" } else { "ember=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match cli.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Onboard => commands::onboard::run(config_path).await?,
        Commands::Agent { message, model } => {
            commands::agent::run(config_path, message, model).await?
        }
        Commands::Memory { action } => match action {
            MemoryCommand::Recall { key } => commands::memory::recall(config_path, &key).await?,
            MemoryCommand::Remember { key, value } => {
                commands::memory::remember(config_path, &key, &value).await?
            }
            MemoryCommand::Search { query } => commands::memory::search(config_path, &query).await?,
            MemoryCommand::Stats => commands::memory::stats(config_path).await?,
        },
        Commands::Recipe { action } => match action {
            RecipeCommand::Run { recipe } => commands::recipe::run(config_path, &recipe).await?,
            RecipeCommand::List => commands::recipe::list(config_path).await?,
            RecipeCommand::Add { file } => commands::recipe::add(config_path, &file).await?,
        },
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Estop { resume } => commands::estop::run(config_path, resume).await?,
    }

    Ok(())
}

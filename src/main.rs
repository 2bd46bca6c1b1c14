use anyhow::Result;
use clap::{Parser, Subcommand};

mod alias_registry;
mod client;
mod commands;
mod config;
mod error;
mod models;
mod observability;
mod port_allocator;
mod resource_model;
mod resource_probe;
mod server_manager;
mod servers;

#[derive(Parser)]
#[command(name = "llmswap")]
#[command(about = "A local multiplexer for llama.cpp and Ollama inference backends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admission/eviction scheduler, serving requests until stopped
    Serve,
    /// List all registered aliases grouped by backend
    List,
    /// Show the running server set for this process
    Status,
    /// One-shot chat completion against an alias
    Ask {
        /// Alias name to resolve
        alias: String,
        /// Prompt text
        prompt: String,
    },
    /// Show resolved configuration
    Config {
        /// Print only the config file paths
        #[arg(short, long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => commands::serve::execute().await?,
        Commands::List => commands::list::execute()?,
        Commands::Status => commands::status::execute().await?,
        Commands::Ask { alias, prompt } => commands::ask::execute(&alias, &prompt).await?,
        Commands::Config { path } => commands::config::execute(path)?,
    }

    Ok(())
}

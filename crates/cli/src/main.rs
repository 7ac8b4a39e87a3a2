//! ragsync CLI
//!
//! Main entry point for the ragsync command-line tool.
//! Keeps a RAG index in step with a document store and answers queries
//! against it.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{QueryCommand, StatsCommand, SyncCommand};
use ragsync_core::{logging, AppConfig};
use ragsync_knowledge::Services;
use std::path::PathBuf;
use std::process::ExitCode;

/// ragsync - incremental RAG index synchronization and retrieval
#[derive(Parser, Debug)]
#[command(name = "ragsync")]
#[command(about = "Incremental RAG index synchronization and retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Root directory of the document store (default: current directory)
    #[arg(short, long, global = true, env = "RAGSYNC_STORE_ROOT")]
    store_root: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Embedding provider (mock, ollama, openai)
    #[arg(long, global = true, env = "RAGSYNC_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    /// Embedding model identifier (default depends on the provider)
    #[arg(long, global = true, env = "RAGSYNC_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Generation provider (ollama, openai)
    #[arg(long, global = true, env = "RAGSYNC_GENERATION_PROVIDER")]
    generation_provider: Option<String>,

    /// Generation model identifier (default depends on the provider)
    #[arg(long, global = true, env = "RAGSYNC_GENERATION_MODEL")]
    generation_model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed new documents and prune removed ones
    Sync(SyncCommand),

    /// Answer a question from the indexed documents
    Query(QueryCommand),

    /// Show ledger and index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Base configuration: defaults, config file, environment
    let config = AppConfig::load_from(cli.store_root.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.store_root,
        cli.config,
        cli.embedding_provider,
        cli.embedding_model,
        cli.generation_provider,
        cli.generation_model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("ragsync starting");
    tracing::debug!("Store root: {:?}", config.store_root);
    tracing::debug!(
        "Embedding: {} ({})",
        config.embedding.provider,
        config.embedding.model
    );
    tracing::debug!(
        "Generation: {} ({})",
        config.generation.provider,
        config.generation.model
    );

    let services = Services::from_config(&config)?;

    let command_name = match &cli.command {
        Commands::Sync(_) => "sync",
        Commands::Query(_) => "query",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let status = match cli.command {
        Commands::Sync(cmd) => cmd.execute(&services).await?,
        Commands::Query(cmd) => cmd.execute(&services).await?,
        Commands::Stats(cmd) => cmd.execute(&services).await?,
    };

    if status >= 400 {
        tracing::error!(status, "Command failed");
        Ok(ExitCode::FAILURE)
    } else {
        tracing::info!(status, "Command completed successfully");
        Ok(ExitCode::SUCCESS)
    }
}

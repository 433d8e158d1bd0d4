//! imgsearch CLI
//!
//! Main entry point for the imgsearch command-line tool: index images and
//! texts with a vision-language encoder and search them by similarity.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    DeleteCommand, DropCommand, IngestCommand, IngestTextCommand, InitCommand, QueryCommand,
    QueryImageCommand, SimilarCommand, StatsCommand,
};
use imgsearch_core::config::{AppConfig, Overrides};
use imgsearch_core::{logging, AppResult};
use std::path::PathBuf;

/// imgsearch - similarity search over image and text embeddings
#[derive(Parser, Debug)]
#[command(name = "imgsearch")]
#[command(about = "Similarity search over image and text embeddings", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "IMGSEARCH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "IMGSEARCH_CONFIG")]
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

    /// SQLite database path
    #[arg(long, global = true, env = "IMGSEARCH_DATABASE")]
    database: Option<PathBuf>,

    /// Collection name
    #[arg(long, global = true, env = "IMGSEARCH_COLLECTION")]
    collection: Option<String>,

    /// Encoder provider (hash, http)
    #[arg(short, long, global = true, env = "IMGSEARCH_ENCODER")]
    encoder: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the collection (replaces an existing one unless --keep-existing)
    Init(InitCommand),

    /// Index image files and directories
    Ingest(IngestCommand),

    /// Index text documents
    IngestText(IngestTextCommand),

    /// Search with a text query
    Query(QueryCommand),

    /// Search with an image query
    QueryImage(QueryImageCommand),

    /// Find items similar to an indexed item
    Similar(SimilarCommand),

    /// Delete records
    Delete(DeleteCommand),

    /// Drop the collection
    Drop(DropCommand),

    /// Show collection statistics
    Stats(StatsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init(_) => "init",
            Commands::Ingest(_) => "ingest",
            Commands::IngestText(_) => "ingest-text",
            Commands::Query(_) => "query",
            Commands::QueryImage(_) => "query-image",
            Commands::Similar(_) => "similar",
            Commands::Delete(_) => "delete",
            Commands::Drop(_) => "drop",
            Commands::Stats(_) => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_with(Overrides {
        workspace: cli.workspace,
        config_file: cli.config,
        database: cli.database,
        collection: cli.collection,
        encoder: cli.encoder,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
    })?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Database: {:?}", config.database_path());
    tracing::debug!(
        "Encoder: {} ({}, {} dims)",
        config.encoder.provider,
        config.encoder.model,
        config.encoder.dimensions
    );

    config.validate()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Init(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::IngestText(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::QueryImage(cmd) => cmd.execute(&config).await,
        Commands::Similar(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Drop(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

//! Filing Index CLI
//!
//! Main entry point for the filing command-line tool. Parses regulatory
//! filings into structural nodes, chunks them for retrieval, and indexes
//! them into the local chunk store.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ChunkCommand, IndexCommand, StatsCommand};
use filing_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Filing Index CLI - structure and chunk regulatory filings for retrieval
#[derive(Parser, Debug)]
#[command(name = "filing")]
#[command(about = "Structure and chunk regulatory filings for retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "FILING_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "FILING_CONFIG")]
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

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and chunk a filing without persisting anything
    Chunk(ChunkCommand),

    /// Parse, chunk, embed, and persist a filing into the chunk store
    Index(IndexCommand),

    /// Show chunk store statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);

    let command_name = match &cli.command {
        Commands::Chunk(_) => "chunk",
        Commands::Index(_) => "index",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Chunk(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    if let Err(e) = &result {
        tracing::error!("Command failed: {}", e);
    }

    result
}

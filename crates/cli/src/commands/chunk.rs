//! Chunk command handler.
//!
//! Parses and chunks a filing without touching the store. Useful for
//! inspecting chunk boundaries and metadata before indexing.

use clap::Args;
use filing_core::{config::AppConfig, AppResult};
use filing_index::loader::{create_loader, FilingLoader};
use filing_index::{ChunkingStats, ParsingStats};

use super::FilingArgs;

/// Parse and chunk a filing, printing statistics or the full chunk set
#[derive(Args, Debug)]
pub struct ChunkCommand {
    #[command(flatten)]
    pub filing: FilingArgs,

    /// Print the full chunk records as JSON
    #[arg(long)]
    pub dump: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChunkCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let chunking_config = filing_index::config::load_config(&config.workspace)?;

        let root = self.filing.root.clone().unwrap_or_else(|| config.workspace.clone());
        let loader_kind = if self.filing.url.is_some() { "http" } else { "file" };
        let loader = create_loader(loader_kind, &root)?;

        let request = self.filing.request();
        let raw = loader.load(&request).await?;
        let (document, chunks) = filing_index::chunk_filing(&raw, &chunking_config)?;

        let parsing = ParsingStats::from_document(&document);
        let chunking = ChunkingStats::from_chunks(&chunks);

        for warning in document.warnings() {
            tracing::warn!("parse warning: {}", warning.message);
        }

        if self.dump {
            println!("{}", serde_json::to_string_pretty(&chunks)?);
        } else if self.json {
            let output = serde_json::json!({
                "filingId": document.meta().filing_id,
                "parsing": parsing,
                "chunking": chunking,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Parsed {} nodes ({} text, {} tables, {} images, {} degraded)",
                parsing.total_nodes,
                parsing.text_nodes,
                parsing.table_nodes,
                parsing.image_nodes,
                parsing.degraded_nodes
            );
            println!(
                "Created {} chunks ({} oversized), {}-{} chars, avg {:.0}",
                chunking.total_chunks,
                chunking.oversized_chunks,
                chunking.min_chars,
                chunking.max_chars,
                chunking.avg_chars
            );
            for (section, stats) in &chunking.sections {
                println!("  {}: {} chunks", section, stats.chunk_count);
            }
        }

        Ok(())
    }
}

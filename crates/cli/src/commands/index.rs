//! Index command handler.
//!
//! Runs the full pipeline for a filing: load, parse, chunk, embed, and
//! persist into the workspace chunk store.

use clap::Args;
use filing_core::{config::AppConfig, AppResult};
use filing_index::embeddings::{create_provider, EmbeddingConfig};
use filing_index::loader::create_loader;
use filing_index::store::SqliteStore;

use super::FilingArgs;

/// Index a filing into the chunk store
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(flatten)]
    pub filing: FilingArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.ensure_filing_dir()?;

        let chunking_config = filing_index::config::load_config(&config.workspace)?;

        let embedding_config = EmbeddingConfig {
            provider: config.embedding.provider.clone(),
            model: config.embedding.model.clone(),
            dimensions: config.embedding.dimensions,
            ..Default::default()
        };
        let embedder = create_provider(&embedding_config)?;

        let root = self.filing.root.clone().unwrap_or_else(|| config.workspace.clone());
        let loader_kind = if self.filing.url.is_some() { "http" } else { "file" };
        let loader = create_loader(loader_kind, &root)?;

        let mut store = SqliteStore::open(&config.store_path())?;

        let request = self.filing.request();
        let outcome = filing_index::index_filing(
            loader.as_ref(),
            embedder.as_ref(),
            &mut store,
            &chunking_config,
            embedding_config.batch_size,
            &request,
        )
        .await?;

        if self.json {
            let output = serde_json::json!({
                "filingId": outcome.filing_id,
                "parsing": outcome.parsing,
                "chunking": outcome.chunking,
                "durationSecs": outcome.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {}: {} nodes, {} chunks in {:.2}s",
                outcome.filing_id,
                outcome.parsing.total_nodes,
                outcome.chunking.total_chunks,
                outcome.duration_secs
            );
        }

        Ok(())
    }
}

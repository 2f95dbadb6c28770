//! Stats command handler.

use clap::Args;
use filing_core::{config::AppConfig, AppError, AppResult};
use filing_index::store::{ChunkStore, SqliteStore};

/// Show chunk store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store_path = config.store_path();
        if !store_path.exists() {
            return Err(AppError::Storage(format!(
                "No chunk store at {:?}. Run 'filing index' first.",
                store_path
            )));
        }

        let store = SqliteStore::open(&store_path)?;
        let stats = store.stats()?;

        if self.json {
            let output = serde_json::json!({
                "filings": stats.filings_count,
                "chunks": stats.chunks_count,
                "storePath": store_path,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Filings: {}", stats.filings_count);
            println!("Chunks:  {}", stats.chunks_count);
            println!("Store:   {:?}", store_path);
        }

        Ok(())
    }
}

//! Command handler modules.

mod chunk;
mod index;
mod stats;

pub use chunk::ChunkCommand;
pub use index::IndexCommand;
pub use stats::StatsCommand;

use clap::Args;
use filing_index::FilingRequest;
use std::path::PathBuf;

/// Shared arguments identifying the filing to process.
#[derive(Args, Debug)]
pub struct FilingArgs {
    /// Path to a local filing document
    #[arg(long, conflicts_with_all = ["ticker", "url"])]
    pub path: Option<PathBuf>,

    /// Ticker symbol, resolved against the documents root
    #[arg(long, requires = "year")]
    pub ticker: Option<String>,

    /// Form type (default: 10-K)
    #[arg(long, default_value = "10-K")]
    pub form: String,

    /// Filing year
    #[arg(long)]
    pub year: Option<i32>,

    /// URL to fetch the filing from
    #[arg(long)]
    pub url: Option<String>,

    /// Documents root for ticker/year lookup (default: workspace)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl FilingArgs {
    pub fn request(&self) -> FilingRequest {
        FilingRequest {
            ticker: self.ticker.clone(),
            form: Some(self.form.clone()),
            year: self.year,
            path: self.path.clone(),
            url: self.url.clone(),
        }
    }
}

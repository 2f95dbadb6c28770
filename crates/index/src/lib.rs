//! Document structuring and semantic chunking engine.
//!
//! Turns long, semi-structured regulatory filings into retrieval-ready
//! chunks that preserve structural provenance (section, page, table
//! identity) for precise citation:
//!
//! - [`parser`] segments a raw filing into typed structural nodes
//! - [`document`] wraps the nodes in an ordered, indexed view
//! - [`chunk`] merges nodes into size-bounded, boundary-respecting chunks
//!   with aggregated metadata
//! - [`loader`], [`embeddings`], and [`store`] are the external
//!   collaborator interfaces with reference implementations
//!
//! Each filing is processed as an independent task owning its own
//! document and chunk set; the only shared value is the immutable
//! chunking configuration.

pub mod chunk;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod loader;
pub mod parser;
pub mod sections;
pub mod stats;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkMetadata, Chunker, NodeSpan, OverlapWindow};
pub use config::{BoundaryPolicy, ChunkingConfig, OverlapUnit, OversizedPolicy};
pub use document::SemanticDocument;
pub use loader::{FilingLoader, FilingRequest};
pub use stats::{ChunkingStats, ParsingStats};
pub use store::{ChunkFilter, ChunkStore, StoredChunk};
pub use types::{FilingMeta, NodeKind, NodePayload, RawFiling, StructuralNode};

use std::time::Instant;

use filing_core::AppResult;
use futures::stream::{self, StreamExt, TryStreamExt};

use embeddings::EmbeddingProvider;

/// Bounded concurrency for embedding batches of one filing, respecting
/// downstream rate limits.
const EMBED_CONCURRENCY: usize = 4;

/// Result of indexing one filing.
#[derive(Debug)]
pub struct IndexOutcome {
    pub filing_id: String,
    pub parsing: ParsingStats,
    pub chunking: ChunkingStats,
    pub duration_secs: f64,
}

/// Parse a raw filing and chunk it under the given configuration.
///
/// Synchronous CPU-bound transform with no side effects; the
/// configuration is validated before any node is touched.
pub fn chunk_filing(
    raw: &RawFiling,
    config: &ChunkingConfig,
) -> AppResult<(SemanticDocument, Vec<Chunk>)> {
    let chunker = Chunker::new(config)?;

    let outcome = parser::parse(&raw.body);
    for warning in &outcome.warnings {
        tracing::warn!(
            "{}: parse warning at node {:?}: {}",
            raw.meta.filing_id,
            warning.position,
            warning.message
        );
    }

    let document = SemanticDocument::new(raw.meta.clone(), outcome.nodes, outcome.warnings)?;
    let chunks = chunker.chunk(&document)?;

    Ok((document, chunks))
}

/// Run the full pipeline for one filing: load, parse, chunk, embed, and
/// persist.
///
/// All-or-nothing: loader failure, a parse invariant violation, or any
/// embedding error aborts before anything is persisted, and the store
/// write itself is transactional. A filing partially represented in the
/// store would yield incorrect citations.
pub async fn index_filing(
    loader: &dyn FilingLoader,
    embedder: &dyn EmbeddingProvider,
    store: &mut dyn ChunkStore,
    config: &ChunkingConfig,
    batch_size: usize,
    request: &FilingRequest,
) -> AppResult<IndexOutcome> {
    config.validate()?;

    let start = Instant::now();
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("index_filing", %run_id, loader = loader.name());
    let _guard = span.enter();

    let raw = loader.load(request).await?;
    tracing::info!(
        "Loaded filing {} ({} bytes)",
        raw.meta.filing_id,
        raw.body.len()
    );

    let (document, chunks) = chunk_filing(&raw, config)?;
    let parsing = ParsingStats::from_document(&document);
    let chunking = ChunkingStats::from_chunks(&chunks);

    if let (Ok(parsing_json), Ok(chunking_json)) = (
        serde_json::to_string(&parsing),
        serde_json::to_string(&chunking),
    ) {
        tracing::debug!("Parsing statistics: {}", parsing_json);
        tracing::debug!("Chunking statistics: {}", chunking_json);
    }

    // Embed in batches with bounded concurrency; any failure aborts the
    // filing before persistence
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let batch_size = batch_size.max(1);
    let batches: Vec<Vec<String>> = texts.chunks(batch_size).map(|b| b.to_vec()).collect();

    let embedded: Vec<Vec<Vec<f32>>> = stream::iter(
        batches
            .into_iter()
            .map(|batch| async move { embedder.embed_batch(&batch).await }),
    )
    .buffered(EMBED_CONCURRENCY)
    .try_collect()
    .await?;

    let embeddings: Vec<Vec<f32>> = embedded.into_iter().flatten().collect();

    let stored: Vec<StoredChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| StoredChunk { chunk, embedding })
        .collect();

    store.persist_filing(document.meta(), &stored)?;

    let duration = start.elapsed();
    tracing::info!(
        "Indexed {}: {} nodes, {} chunks in {:.2}s",
        document.meta().filing_id,
        parsing.total_nodes,
        chunking.total_chunks,
        duration.as_secs_f64()
    );

    Ok(IndexOutcome {
        filing_id: document.meta().filing_id.clone(),
        parsing,
        chunking,
        duration_secs: duration.as_secs_f64(),
    })
}

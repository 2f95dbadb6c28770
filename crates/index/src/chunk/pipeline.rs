//! Greedy single-pass chunker.
//!
//! Walks the document's nodes in order, accumulating them into a chunk
//! buffer under the configured budget. Close conditions are evaluated in
//! a fixed order (size limit, then section boundary, then atomic fit), so
//! identical input and configuration always produce the identical chunk
//! sequence. Overlap is computed from the closed chunk's tail and
//! duplicated forward, never backward.
//!
//! Tables and images are atomic: they fit whole or force a boundary, and
//! one that exceeds the budget on its own becomes a standalone chunk
//! flagged `oversized`. Text nodes that outgrow the budget either split
//! at a semantic sub-boundary or stand alone flagged, per policy.

use filing_core::AppResult;

use crate::config::{BoundaryPolicy, ChunkingConfig, OversizedPolicy};
use crate::document::SemanticDocument;
use crate::types::{NodeKind, StructuralNode};

use super::accumulator::{ChunkAccumulator, Piece};
use super::{splitter, Chunk};

/// Merges structural nodes into chunks under one immutable
/// configuration. The configuration is validated at construction, before
/// any node is touched.
pub struct Chunker<'a> {
    config: &'a ChunkingConfig,
}

impl<'a> Chunker<'a> {
    pub fn new(config: &'a ChunkingConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Produce the ordered chunk sequence for a document.
    pub fn chunk(&self, document: &SemanticDocument) -> AppResult<Vec<Chunk>> {
        let filing_id = document.meta().filing_id.clone();
        let mut chunks = Vec::new();
        let mut acc = ChunkAccumulator::new(self.config.max_chunk_size, None);

        for node in document.iter() {
            match node.kind() {
                NodeKind::Table | NodeKind::Image => {
                    self.place_atomic(node, &mut acc, &mut chunks, &filing_id);
                }
                NodeKind::Text => {
                    self.place_text(node, &mut acc, &mut chunks, &filing_id);
                }
            }
        }

        // The final partially filled buffer always flushes
        self.close(&mut acc, &mut chunks, &filing_id, false);

        let oversized = chunks.iter().filter(|c| c.metadata.oversized).count();
        if oversized > 0 {
            tracing::warn!(
                "{} of {} chunks exceed the size limit (atomic content)",
                oversized,
                chunks.len()
            );
        }
        tracing::debug!(
            "Chunked {} nodes into {} chunks for {}",
            document.len(),
            chunks.len(),
            filing_id
        );

        Ok(chunks)
    }

    /// Place a table or image node. Atomic: fits whole or forces a
    /// boundary.
    fn place_atomic(
        &self,
        node: &StructuralNode,
        acc: &mut ChunkAccumulator,
        chunks: &mut Vec<Chunk>,
        filing_id: &str,
    ) {
        let text = node.text();
        let chars = text.chars().count();
        let crosses = self.section_break(acc, node);
        let isolate = self.config.boundary_policy == BoundaryPolicy::RespectTable;

        if acc.has_pieces() {
            if isolate || !acc.fits(chars) {
                self.close(acc, chunks, filing_id, !crosses);
            } else if crosses {
                self.close(acc, chunks, filing_id, false);
            }
        }

        // A seeded overlap never outranks an atomic node: free the
        // budget rather than split or spuriously flag
        if !acc.fits(chars) && !acc.has_pieces() {
            acc.drop_overlap();
        }

        if acc.fits(chars) {
            acc.push(whole_piece(node, text, chars));
            if isolate {
                self.close(acc, chunks, filing_id, true);
            }
        } else {
            // Alone above the limit: standalone and flagged, never split
            acc.push(whole_piece(node, text, chars));
            self.close_oversized(acc, chunks, filing_id);
        }
    }

    /// Place a text node, splitting or standing it alone when it exceeds
    /// the budget.
    fn place_text(
        &self,
        node: &StructuralNode,
        acc: &mut ChunkAccumulator,
        chunks: &mut Vec<Chunk>,
        filing_id: &str,
    ) {
        let text = node.text();
        if text.is_empty() {
            return;
        }

        if self.section_break(acc, node) {
            self.close(acc, chunks, filing_id, false);
        }

        let mut start = 0usize;

        loop {
            let rest = &text[start..];
            let rest_chars = rest.chars().count();

            if acc.fits(rest_chars) {
                acc.push(text_piece(node, rest, start, text.len()));
                return;
            }

            match self.config.oversized_policy {
                OversizedPolicy::Split => {
                    let limit = acc.remaining();
                    if limit == 0 {
                        self.close(acc, chunks, filing_id, true);
                        continue;
                    }

                    let cut = splitter::split_point(rest, limit);
                    acc.push(text_piece(node, &rest[..cut], start, start + cut));
                    self.close(acc, chunks, filing_id, true);
                    start += cut;
                }
                OversizedPolicy::StandaloneFlagged => {
                    if acc.has_pieces() {
                        self.close(acc, chunks, filing_id, true);
                        continue;
                    }

                    // Fresh buffer: a node blocked only by the seeded
                    // overlap goes in clean instead of being flagged
                    acc.drop_overlap();
                    if acc.fits(rest_chars) {
                        acc.push(text_piece(node, rest, start, text.len()));
                        return;
                    }

                    acc.push(text_piece(node, rest, start, text.len()));
                    self.close_oversized(acc, chunks, filing_id);
                    return;
                }
            }
        }
    }

    /// Does placing this node require closing at a section boundary?
    fn section_break(&self, acc: &ChunkAccumulator, node: &StructuralNode) -> bool {
        if !acc.has_pieces() {
            return false;
        }
        if acc.section() == node.section.as_deref() {
            return false;
        }

        match self.config.boundary_policy {
            BoundaryPolicy::RespectSection => true,
            // Soft: carry small buffers across instead of emitting
            // fragments
            BoundaryPolicy::PreferSection => acc.piece_chars() >= self.config.min_chunk_size,
            BoundaryPolicy::RespectTable | BoundaryPolicy::AllowCrossSection => false,
        }
    }

    /// Finalize the buffer as a chunk, seeding the next buffer with the
    /// overlap window when requested. Section-boundary closes do not
    /// seed: overlap never crosses a section edge.
    fn close(
        &self,
        acc: &mut ChunkAccumulator,
        chunks: &mut Vec<Chunk>,
        filing_id: &str,
        seed_overlap: bool,
    ) {
        if !acc.has_pieces() {
            return;
        }

        let seed = if seed_overlap {
            acc.tail_overlap(self.config)
        } else {
            None
        };

        let finished = std::mem::replace(
            acc,
            ChunkAccumulator::new(self.config.max_chunk_size, seed),
        );
        chunks.push(finished.finish(filing_id, chunks.len() as u32, false));
    }

    /// Finalize a single atomic or unsplittable node as its own flagged
    /// chunk.
    fn close_oversized(
        &self,
        acc: &mut ChunkAccumulator,
        chunks: &mut Vec<Chunk>,
        filing_id: &str,
    ) {
        let seed = acc.tail_overlap(self.config);
        let finished = std::mem::replace(
            acc,
            ChunkAccumulator::new(self.config.max_chunk_size, seed),
        );
        let chunk = finished.finish(filing_id, chunks.len() as u32, true);
        tracing::warn!(
            "chunk {} exceeds max_chunk_size ({} chars): atomic content emitted standalone",
            chunk.id,
            chunk.char_len()
        );
        chunks.push(chunk);
    }
}

fn whole_piece(node: &StructuralNode, text: String, chars: usize) -> Piece {
    let min_text = matches!(node.kind(), NodeKind::Table | NodeKind::Image)
        .then(|| node.min_text());
    Piece {
        node: node.id.clone(),
        kind: node.kind(),
        section: node.section.clone(),
        page: node.page,
        degraded: node.degraded,
        text,
        chars,
        range: None,
        min_text,
    }
}

fn text_piece(node: &StructuralNode, slice: &str, start: usize, end: usize) -> Piece {
    let whole = start == 0 && end == node.text().len();
    Piece {
        node: node.id.clone(),
        kind: NodeKind::Text,
        section: node.section.clone(),
        page: node.page,
        degraded: node.degraded,
        text: slice.to_string(),
        chars: slice.chars().count(),
        range: (!whole).then_some(start..end),
        min_text: None,
    }
}

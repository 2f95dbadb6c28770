//! Budgeted chunk accumulation.
//!
//! The accumulator collects node pieces until the character budget runs
//! out, then turns into a finished chunk. It also extracts the overlap
//! window that seeds the next accumulator: the trailing slice of its own
//! assembled content, or the minimal rendering when the tail is a table
//! or image (which are never cut mid-content).

use std::ops::Range;

use crate::config::{ChunkingConfig, OverlapUnit};
use crate::types::{NodeId, NodeKind, SectionId};

use super::metadata;
use super::{Chunk, PART_SEPARATOR};

/// One node's contribution to the chunk under construction.
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub node: NodeId,
    pub kind: NodeKind,
    pub section: Option<SectionId>,
    pub page: Option<u32>,
    pub degraded: bool,

    /// Contributed text (a sub-slice of the node text when split)
    pub text: String,

    /// Character count of `text`
    pub chars: usize,

    /// Byte range into the node text for split text nodes
    pub range: Option<Range<usize>>,

    /// Minimal rendering, present for tables and images
    pub min_text: Option<String>,
}

/// Overlap content carried from a closed chunk into the next one.
#[derive(Debug, Clone)]
pub(crate) struct OverlapSeed {
    pub text: String,
    pub chars: usize,
    pub source_nodes: Vec<NodeId>,
}

/// Accumulates pieces into a properly sized chunk.
#[derive(Debug)]
pub(crate) struct ChunkAccumulator {
    max_size: usize,
    pieces: Vec<Piece>,
    overlap: Option<OverlapSeed>,
    /// Characters used so far, overlap included, joiners excluded
    used: usize,
}

impl ChunkAccumulator {
    /// Start a fresh accumulator, optionally seeded with overlap. A seed
    /// that alone reaches the budget is discarded: it could never
    /// coexist with content.
    pub fn new(max_size: usize, overlap: Option<OverlapSeed>) -> Self {
        let overlap = overlap.filter(|seed| seed.chars < max_size);
        let used = overlap.as_ref().map(|seed| seed.chars).unwrap_or(0);
        Self {
            max_size,
            pieces: Vec::new(),
            overlap,
            used,
        }
    }

    pub fn has_pieces(&self) -> bool {
        !self.pieces.is_empty()
    }

    /// Characters still available under the budget.
    pub fn remaining(&self) -> usize {
        self.max_size.saturating_sub(self.used)
    }

    pub fn fits(&self, chars: usize) -> bool {
        self.used + chars <= self.max_size
    }

    /// Section of the first accumulated piece.
    pub fn section(&self) -> Option<&str> {
        self.pieces.first().and_then(|p| p.section.as_deref())
    }

    /// Characters contributed by pieces alone, overlap excluded.
    pub fn piece_chars(&self) -> usize {
        let overlap = self.overlap.as_ref().map(|o| o.chars).unwrap_or(0);
        self.used - overlap
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap.as_ref().map(|o| o.chars).unwrap_or(0)
    }

    pub fn push(&mut self, piece: Piece) {
        self.used += piece.chars;
        self.pieces.push(piece);
    }

    /// Discard the overlap seed, freeing its budget.
    pub fn drop_overlap(&mut self) {
        if let Some(seed) = self.overlap.take() {
            self.used -= seed.chars;
        }
    }

    /// Compute the overlap window from this accumulator's tail.
    ///
    /// A table or image tail contributes its minimal rendering whole,
    /// even when that exceeds the configured window. Text tails yield
    /// either a character window over the assembled content or trailing
    /// whole nodes, depending on the configured unit.
    pub fn tail_overlap(&self, config: &ChunkingConfig) -> Option<OverlapSeed> {
        if config.overlap_size == 0 {
            return None;
        }

        let last = self.pieces.last()?;
        if matches!(last.kind, NodeKind::Table | NodeKind::Image) {
            let text = last.min_text.clone().unwrap_or_else(|| last.text.clone());
            let chars = text.chars().count();
            return Some(OverlapSeed {
                text,
                chars,
                source_nodes: vec![last.node.clone()],
            });
        }

        match config.overlap_unit {
            OverlapUnit::Chars => self.char_tail(config.overlap_size),
            OverlapUnit::Nodes => self.node_tail(config.overlap_size),
        }
    }

    /// Trailing `window` characters of the assembled piece content.
    fn char_tail(&self, window: usize) -> Option<OverlapSeed> {
        let joined = self
            .pieces
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PART_SEPARATOR);

        let total = joined.chars().count();
        let take = window.min(total);
        if take == 0 {
            return None;
        }

        let skip = total - take;
        let start = joined
            .char_indices()
            .nth(skip)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let text = joined[start..].to_string();

        // Walk pieces from the back until the window is covered
        let mut source_nodes = Vec::new();
        let mut covered = 0;
        for piece in self.pieces.iter().rev() {
            if source_nodes.last() != Some(&piece.node) {
                source_nodes.push(piece.node.clone());
            }
            covered += piece.chars;
            if covered >= take {
                break;
            }
        }
        source_nodes.reverse();

        Some(OverlapSeed {
            text,
            chars: take,
            source_nodes,
        })
    }

    /// Trailing whole pieces whose combined length fits the window.
    fn node_tail(&self, window: usize) -> Option<OverlapSeed> {
        let mut selected: Vec<&Piece> = Vec::new();
        let mut total = 0;

        for piece in self.pieces.iter().rev() {
            if total + piece.chars > window {
                break;
            }
            total += piece.chars;
            selected.push(piece);
        }

        if selected.is_empty() {
            return None;
        }
        selected.reverse();

        let text = selected
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PART_SEPARATOR);
        let mut source_nodes: Vec<NodeId> = Vec::new();
        for piece in &selected {
            if source_nodes.last() != Some(&piece.node) {
                source_nodes.push(piece.node.clone());
            }
        }

        Some(OverlapSeed {
            text,
            chars: total,
            source_nodes,
        })
    }

    /// Finalize into a chunk. Callers must not finish an accumulator
    /// without pieces.
    pub fn finish(self, filing_id: &str, sequence: u32, oversized: bool) -> Chunk {
        metadata::build_chunk(filing_id, sequence, self.pieces, self.overlap, oversized)
    }
}

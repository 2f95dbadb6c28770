//! Chunk assembly: merging structural nodes into size-bounded,
//! boundary-respecting retrieval units.
//!
//! This module provides:
//! - Chunk and metadata types (this file)
//! - A budgeted accumulator with overlap extraction
//! - The greedy single-pass chunker
//! - Oversized text splitting at semantic sub-boundaries

pub(crate) mod accumulator;
mod metadata;
pub mod pipeline;
mod splitter;

pub use pipeline::Chunker;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

use crate::types::{NodeId, NodeKind, SectionId};

/// Portion of a structural node included in a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpan {
    /// Constituent node id
    pub node: NodeId,

    /// Byte range into the node's text when only part of it is included
    /// (split text nodes only); `None` means the whole node.
    pub range: Option<Range<usize>>,
}

/// Marker for the leading portion of a chunk duplicated from the
/// previous chunk's tail. Coverage accounting excludes this portion when
/// reconstructing original content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapWindow {
    /// Byte length of the duplicated prefix of `content`
    pub bytes: usize,

    /// Character count of the duplicated prefix
    pub chars: usize,

    /// Nodes the duplicated content came from
    pub source_nodes: Vec<NodeId>,
}

/// Aggregated, independently filterable chunk metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Union of constituent node sections
    pub section_set: BTreeSet<SectionId>,

    /// Minimum constituent page number
    pub page_min: Option<u32>,

    /// Maximum constituent page number
    pub page_max: Option<u32>,

    /// Variants present among constituent nodes
    pub node_kinds: BTreeSet<NodeKind>,

    /// Table nodes referenced by this chunk, overlap sources included
    pub table_refs: Vec<NodeId>,

    /// Image nodes referenced by this chunk, overlap sources included
    pub image_refs: Vec<NodeId>,

    /// Display name of the section, when the chunk sits in exactly one
    /// known section
    pub section_title: Option<String>,

    /// Description of the section, same condition
    pub section_description: Option<String>,

    /// True when a single atomic node exceeded the size limit and was
    /// emitted alone
    pub oversized: bool,

    /// True when any constituent node was parsed in degraded form
    pub degraded: bool,

    /// SHA-256 hash of the chunk content
    pub content_hash: String,
}

/// A bounded-size, ordered merge of structural nodes.
///
/// Ids are deterministic (`<filing_id>:<sequence>`): identical input and
/// configuration always reproduce identical chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,

    pub filing_id: String,

    /// Position in the chunk sequence (0-based)
    pub sequence: u32,

    /// Assembled content: optional overlap prefix plus constituent node
    /// texts, joined by blank lines
    pub content: String,

    /// Constituent nodes in order, with sub-ranges for split text nodes
    pub spans: Vec<NodeSpan>,

    /// Present when the content starts with duplicated overlap
    pub overlap: Option<OverlapWindow>,

    pub metadata: ChunkMetadata,
}

/// Joiner between assembled content parts.
pub(crate) const PART_SEPARATOR: &str = "\n\n";

impl Chunk {
    /// Content excluding the duplicated overlap prefix and its joiner.
    pub fn original_content(&self) -> &str {
        match &self.overlap {
            None => &self.content,
            Some(overlap) => {
                let rest = &self.content[overlap.bytes..];
                rest.strip_prefix(PART_SEPARATOR).unwrap_or(rest)
            }
        }
    }

    /// Budgeted length in characters: overlap plus node content. The
    /// joiners between merged parts are presentation, not content, and
    /// are not counted.
    pub fn char_len(&self) -> usize {
        let parts = self.spans.len() + usize::from(self.overlap.is_some());
        let joiners = PART_SEPARATOR.len() * parts.saturating_sub(1);
        self.content.chars().count().saturating_sub(joiners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_content_strips_overlap() {
        let overlap_text = "tail of previous";
        let chunk = Chunk {
            id: "f:0001".to_string(),
            filing_id: "f".to_string(),
            sequence: 1,
            content: format!("{}{}fresh content", overlap_text, PART_SEPARATOR),
            spans: vec![NodeSpan {
                node: "text_00001".to_string(),
                range: None,
            }],
            overlap: Some(OverlapWindow {
                bytes: overlap_text.len(),
                chars: overlap_text.chars().count(),
                source_nodes: vec!["text_00000".to_string()],
            }),
            metadata: ChunkMetadata::default(),
        };

        assert_eq!(chunk.original_content(), "fresh content");
    }

    #[test]
    fn test_char_len_excludes_joiners() {
        let chunk = Chunk {
            id: "f:0000".to_string(),
            filing_id: "f".to_string(),
            sequence: 0,
            content: format!("{}{}{}", "a".repeat(10), PART_SEPARATOR, "b".repeat(20)),
            spans: vec![
                NodeSpan {
                    node: "text_00000".to_string(),
                    range: None,
                },
                NodeSpan {
                    node: "text_00001".to_string(),
                    range: None,
                },
            ],
            overlap: None,
            metadata: ChunkMetadata::default(),
        };

        assert_eq!(chunk.char_len(), 30);
    }
}

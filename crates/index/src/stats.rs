//! Parsing and chunking statistics.
//!
//! Computed after each stage so operators can audit quality without
//! failing the pipeline. Logged at debug level as JSON and surfaced
//! through the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::chunk::Chunk;
use crate::document::SemanticDocument;
use crate::types::NodeKind;

/// Per-section node counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionNodeStats {
    pub node_count: usize,
    pub text_nodes: usize,
    pub table_nodes: usize,
    pub image_nodes: usize,
    pub total_text_chars: usize,
    pub avg_text_chars: f64,
}

/// Statistics about structural node creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingStats {
    pub total_nodes: usize,
    pub text_nodes: usize,
    pub table_nodes: usize,
    pub image_nodes: usize,
    pub degraded_nodes: usize,
    pub warning_count: usize,
    pub section_count: usize,
    pub sections: BTreeMap<String, SectionNodeStats>,
}

impl ParsingStats {
    pub fn from_document(document: &SemanticDocument) -> Self {
        let mut stats = Self {
            total_nodes: document.len(),
            warning_count: document.warnings().len(),
            ..Default::default()
        };

        for node in document.iter() {
            match node.kind() {
                NodeKind::Text => stats.text_nodes += 1,
                NodeKind::Table => stats.table_nodes += 1,
                NodeKind::Image => stats.image_nodes += 1,
            }
            if node.degraded {
                stats.degraded_nodes += 1;
            }

            if let Some(section) = &node.section {
                let entry = stats.sections.entry(section.clone()).or_default();
                entry.node_count += 1;
                match node.kind() {
                    NodeKind::Text => {
                        entry.text_nodes += 1;
                        entry.total_text_chars += node.char_len();
                    }
                    NodeKind::Table => entry.table_nodes += 1,
                    NodeKind::Image => entry.image_nodes += 1,
                }
            }
        }

        for entry in stats.sections.values_mut() {
            if entry.text_nodes > 0 {
                entry.avg_text_chars = entry.total_text_chars as f64 / entry.text_nodes as f64;
            }
        }
        stats.section_count = stats.sections.len();

        stats
    }
}

/// Per-section chunk counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionChunkStats {
    pub chunk_count: usize,
    pub total_chars: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub avg_chars: f64,
    pub table_chunks: usize,
    pub image_chunks: usize,
}

/// Statistics about chunk creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub total_words: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub avg_chars: f64,
    pub oversized_chunks: usize,
    pub degraded_chunks: usize,
    pub overlapped_chunks: usize,
    pub sections: BTreeMap<String, SectionChunkStats>,
}

impl ChunkingStats {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut stats = Self {
            total_chunks: chunks.len(),
            min_chars: usize::MAX,
            ..Default::default()
        };

        for chunk in chunks {
            let chars = chunk.char_len();
            stats.total_chars += chars;
            stats.total_words += chunk.content.unicode_words().count();
            stats.min_chars = stats.min_chars.min(chars);
            stats.max_chars = stats.max_chars.max(chars);

            if chunk.metadata.oversized {
                stats.oversized_chunks += 1;
            }
            if chunk.metadata.degraded {
                stats.degraded_chunks += 1;
            }
            if chunk.overlap.is_some() {
                stats.overlapped_chunks += 1;
            }

            for section in &chunk.metadata.section_set {
                let entry = stats.sections.entry(section.clone()).or_default();
                entry.chunk_count += 1;
                entry.total_chars += chars;
                entry.min_chars = if entry.min_chars == 0 {
                    chars
                } else {
                    entry.min_chars.min(chars)
                };
                entry.max_chars = entry.max_chars.max(chars);
                if !chunk.metadata.table_refs.is_empty() {
                    entry.table_chunks += 1;
                }
                if !chunk.metadata.image_refs.is_empty() {
                    entry.image_chunks += 1;
                }
            }
        }

        if chunks.is_empty() {
            stats.min_chars = 0;
        } else {
            stats.avg_chars = stats.total_chars as f64 / chunks.len() as f64;
        }
        for entry in stats.sections.values_mut() {
            if entry.chunk_count > 0 {
                entry.avg_chars = entry.total_chars as f64 / entry.chunk_count as f64;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SemanticDocument;
    use crate::types::{FilingMeta, NodePayload, StructuralNode};

    #[test]
    fn test_parsing_stats_counts() {
        let nodes = vec![
            StructuralNode {
                id: "text_00000".to_string(),
                section: Some("Item 1".to_string()),
                page: None,
                position: 0,
                degraded: false,
                payload: NodePayload::Text {
                    text: "ab".repeat(10),
                },
            },
            StructuralNode {
                id: "text_00001".to_string(),
                section: Some("Item 1".to_string()),
                page: None,
                position: 1,
                degraded: true,
                payload: NodePayload::Text {
                    text: "flattened table".to_string(),
                },
            },
        ];
        let doc = SemanticDocument::new(FilingMeta::default(), nodes, vec![]).unwrap();

        let stats = ParsingStats::from_document(&doc);
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.text_nodes, 2);
        assert_eq!(stats.degraded_nodes, 1);
        assert_eq!(stats.section_count, 1);
        assert_eq!(stats.sections["Item 1"].node_count, 2);
    }

    #[test]
    fn test_chunking_stats_empty() {
        let stats = ChunkingStats::from_chunks(&[]);
        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.min_chars, 0);
        assert_eq!(stats.avg_chars, 0.0);
    }
}

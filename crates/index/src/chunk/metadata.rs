//! Chunk metadata aggregation.
//!
//! Folds constituent-node location metadata into the chunk-level record
//! the storage collaborator filters on: section union, page min/max,
//! variant set, table/image references, degradation flags, and a content
//! hash.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::sections;
use crate::types::NodeKind;

use super::accumulator::{OverlapSeed, Piece};
use super::{Chunk, ChunkMetadata, NodeSpan, OverlapWindow, PART_SEPARATOR};

/// Assemble a finished chunk from accumulated pieces.
pub(crate) fn build_chunk(
    filing_id: &str,
    sequence: u32,
    pieces: Vec<Piece>,
    overlap: Option<OverlapSeed>,
    oversized: bool,
) -> Chunk {
    let mut parts: Vec<&str> = Vec::with_capacity(pieces.len() + 1);
    if let Some(seed) = &overlap {
        parts.push(&seed.text);
    }
    parts.extend(pieces.iter().map(|p| p.text.as_str()));
    let content = parts.join(PART_SEPARATOR);

    let metadata = aggregate(&pieces, overlap.as_ref(), oversized, &content);

    let spans = pieces
        .iter()
        .map(|p| NodeSpan {
            node: p.node.clone(),
            range: p.range.clone(),
        })
        .collect();

    let overlap = overlap.map(|seed| OverlapWindow {
        bytes: seed.text.len(),
        chars: seed.chars,
        source_nodes: seed.source_nodes,
    });

    Chunk {
        id: format!("{}:{:04}", filing_id, sequence),
        filing_id: filing_id.to_string(),
        sequence,
        content,
        spans,
        overlap,
        metadata,
    }
}

/// Compute the aggregated metadata record for a chunk.
fn aggregate(
    pieces: &[Piece],
    overlap: Option<&OverlapSeed>,
    oversized: bool,
    content: &str,
) -> ChunkMetadata {
    let mut section_set = BTreeSet::new();
    let mut node_kinds = BTreeSet::new();
    let mut table_refs = Vec::new();
    let mut image_refs = Vec::new();
    let mut page_min = None;
    let mut page_max = None;
    let mut degraded = false;

    for piece in pieces {
        if let Some(section) = &piece.section {
            section_set.insert(section.clone());
        }
        node_kinds.insert(piece.kind);
        degraded |= piece.degraded;

        if let Some(page) = piece.page {
            page_min = Some(page_min.map_or(page, |min: u32| min.min(page)));
            page_max = Some(page_max.map_or(page, |max: u32| max.max(page)));
        }

        match piece.kind {
            NodeKind::Table => push_ref(&mut table_refs, &piece.node),
            NodeKind::Image => push_ref(&mut image_refs, &piece.node),
            NodeKind::Text => {}
        }
    }

    // Overlap sources keep their table/image references queryable from
    // the chunk that duplicates their content
    if let Some(seed) = overlap {
        for node in &seed.source_nodes {
            if node.starts_with("table_") {
                push_ref(&mut table_refs, node);
            } else if node.starts_with("image_") {
                push_ref(&mut image_refs, node);
            }
        }
    }

    let section_info = if section_set.len() == 1 {
        section_set.iter().next().and_then(|s| sections::lookup(s))
    } else {
        None
    };

    ChunkMetadata {
        section_set,
        page_min,
        page_max,
        node_kinds,
        table_refs,
        image_refs,
        section_title: section_info.map(|i| i.display_name.to_string()),
        section_description: section_info.map(|i| i.description.to_string()),
        oversized,
        degraded,
        content_hash: calculate_hash(content),
    }
}

fn push_ref(refs: &mut Vec<String>, node: &str) {
    if !refs.iter().any(|r| r == node) {
        refs.push(node.to_string());
    }
}

/// Calculate SHA-256 hash of text.
pub(crate) fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(node: &str, kind: NodeKind, section: Option<&str>, page: Option<u32>) -> Piece {
        Piece {
            node: node.to_string(),
            kind,
            section: section.map(String::from),
            page,
            degraded: false,
            text: format!("content of {}", node),
            chars: 0,
            range: None,
            min_text: None,
        }
    }

    #[test]
    fn test_aggregate_sections_and_pages() {
        let pieces = vec![
            piece("text_00000", NodeKind::Text, Some("Item 1"), Some(4)),
            piece("table_00001", NodeKind::Table, Some("Item 1"), Some(6)),
            piece("text_00002", NodeKind::Text, Some("Item 1A"), Some(5)),
        ];

        let chunk = build_chunk("acme-10-K-2024", 3, pieces, None, false);
        let meta = &chunk.metadata;

        assert_eq!(
            meta.section_set.iter().collect::<Vec<_>>(),
            vec!["Item 1", "Item 1A"]
        );
        assert_eq!(meta.page_min, Some(4));
        assert_eq!(meta.page_max, Some(6));
        assert_eq!(meta.table_refs, vec!["table_00001".to_string()]);
        assert!(meta.node_kinds.contains(&NodeKind::Table));
        // More than one section: no registry enrichment
        assert!(meta.section_title.is_none());
    }

    #[test]
    fn test_aggregate_single_section_enriched() {
        let pieces = vec![piece("text_00000", NodeKind::Text, Some("Item 7"), None)];
        let chunk = build_chunk("f", 0, pieces, None, false);

        assert_eq!(
            chunk.metadata.section_title.as_deref(),
            Some("Management's Discussion and Analysis")
        );
        assert!(chunk.metadata.section_description.is_some());
    }

    #[test]
    fn test_overlap_sources_contribute_refs() {
        let pieces = vec![piece("text_00002", NodeKind::Text, None, None)];
        let seed = OverlapSeed {
            text: "Columns: 2024".to_string(),
            chars: 13,
            source_nodes: vec!["table_00001".to_string()],
        };

        let chunk = build_chunk("f", 1, pieces, Some(seed), false);
        assert_eq!(chunk.metadata.table_refs, vec!["table_00001".to_string()]);
        assert!(chunk.content.starts_with("Columns: 2024"));
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let make = || {
            build_chunk(
                "acme-10-K-2024",
                7,
                vec![piece("text_00000", NodeKind::Text, None, None)],
                None,
                false,
            )
        };
        let a = make();
        let b = make();

        assert_eq!(a.id, "acme-10-K-2024:0007");
        assert_eq!(a.id, b.id);
        assert_eq!(a.metadata.content_hash, b.metadata.content_hash);
    }

    #[test]
    fn test_calculate_hash() {
        let hash = calculate_hash("Hello, world!");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, calculate_hash("Hello, world!"));
        assert_ne!(hash, calculate_hash("Different text"));
    }
}

//! Semantic document index.
//!
//! Owns the parsed node arena and derived lookup indices. Indices store
//! arena offsets, never node values, so nodes carry no back-reference
//! into the document and nothing is copied.

use std::collections::{BTreeMap, HashMap};

use filing_core::{AppError, AppResult};

use crate::types::{FilingMeta, NodeKind, ParseWarning, SectionId, StructuralNode};

/// An ordered, indexed view over the structural nodes of one filing.
///
/// Construction validates the structural invariants: unique ids,
/// strictly increasing gap-free positions. The document is immutable
/// once built; all navigation goes through id lookups.
#[derive(Debug)]
pub struct SemanticDocument {
    meta: FilingMeta,
    nodes: Vec<StructuralNode>,
    by_id: HashMap<String, usize>,
    by_section: BTreeMap<SectionId, Vec<usize>>,
    by_page: BTreeMap<u32, Vec<usize>>,
    by_kind: BTreeMap<NodeKind, Vec<usize>>,
    warnings: Vec<ParseWarning>,
}

/// Contiguous run of nodes sharing one section value, in document order.
#[derive(Debug)]
pub struct SectionView<'a> {
    pub section: Option<&'a str>,
    pub nodes: Vec<&'a StructuralNode>,
}

impl<'a> SectionView<'a> {
    /// Sorted distinct page numbers of this section's nodes.
    pub fn page_numbers(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.nodes.iter().filter_map(|n| n.page).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// First and last page of this section, when any node carries one.
    pub fn page_range(&self) -> Option<(u32, u32)> {
        let pages = self.page_numbers();
        Some((*pages.first()?, *pages.last()?))
    }
}

impl SemanticDocument {
    /// Build the document from parsed nodes, validating invariants.
    pub fn new(
        meta: FilingMeta,
        nodes: Vec<StructuralNode>,
        warnings: Vec<ParseWarning>,
    ) -> AppResult<Self> {
        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut by_section: BTreeMap<SectionId, Vec<usize>> = BTreeMap::new();
        let mut by_page: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut by_kind: BTreeMap<NodeKind, Vec<usize>> = BTreeMap::new();

        for (i, node) in nodes.iter().enumerate() {
            if node.position != i as u32 {
                return Err(AppError::Parse(format!(
                    "node {} has position {}, expected {}",
                    node.id, node.position, i
                )));
            }

            if by_id.insert(node.id.clone(), i).is_some() {
                return Err(AppError::Parse(format!("duplicate node id: {}", node.id)));
            }

            if let Some(section) = &node.section {
                by_section.entry(section.clone()).or_default().push(i);
            }
            if let Some(page) = node.page {
                by_page.entry(page).or_default().push(i);
            }
            by_kind.entry(node.kind()).or_default().push(i);
        }

        Ok(Self {
            meta,
            nodes,
            by_id,
            by_section,
            by_page,
            by_kind,
            warnings,
        })
    }

    /// Filing metadata from the loader.
    pub fn meta(&self) -> &FilingMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> &[StructuralNode] {
        &self.nodes
    }

    /// Iterate nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &StructuralNode> {
        self.nodes.iter()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&StructuralNode> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    /// Node following the given one in document order.
    pub fn next_node(&self, id: &str) -> Option<&StructuralNode> {
        let i = *self.by_id.get(id)?;
        self.nodes.get(i + 1)
    }

    /// Node preceding the given one in document order.
    pub fn prev_node(&self, id: &str) -> Option<&StructuralNode> {
        let i = *self.by_id.get(id)?;
        i.checked_sub(1).map(|p| &self.nodes[p])
    }

    /// Nodes belonging to one section, in document order.
    pub fn section_nodes(&self, section: &str) -> Vec<&StructuralNode> {
        self.by_section
            .get(section)
            .map(|idxs| idxs.iter().map(|&i| &self.nodes[i]).collect())
            .unwrap_or_default()
    }

    /// Section identifiers in first-appearance order.
    pub fn sections(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for node in &self.nodes {
            if let Some(section) = node.section.as_deref() {
                if !seen.contains(&section) {
                    seen.push(section);
                }
            }
        }
        seen
    }

    /// Iterate contiguous section runs, the chunker's primary view.
    /// Consecutive nodes with the same section value group together;
    /// unsectioned front matter forms its own run.
    pub fn section_views(&self) -> Vec<SectionView<'_>> {
        let mut views: Vec<SectionView<'_>> = Vec::new();

        for node in &self.nodes {
            let section = node.section.as_deref();
            match views.last_mut() {
                Some(view) if view.section == section => view.nodes.push(node),
                _ => views.push(SectionView {
                    section,
                    nodes: vec![node],
                }),
            }
        }

        views
    }

    /// Nodes carrying the given page number, in document order.
    pub fn nodes_on_page(&self, page: u32) -> Vec<&StructuralNode> {
        self.by_page
            .get(&page)
            .map(|idxs| idxs.iter().map(|&i| &self.nodes[i]).collect())
            .unwrap_or_default()
    }

    /// Nodes of the given variant, in document order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&StructuralNode> {
        self.by_kind
            .get(&kind)
            .map(|idxs| idxs.iter().map(|&i| &self.nodes[i]).collect())
            .unwrap_or_default()
    }

    /// Min and max page number across the whole document.
    pub fn page_range(&self) -> Option<(u32, u32)> {
        let min = *self.by_page.keys().next()?;
        let max = *self.by_page.keys().next_back()?;
        Some((min, max))
    }

    /// Warnings accumulated while parsing this document.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodePayload;

    fn text_node(position: u32, section: Option<&str>, page: Option<u32>) -> StructuralNode {
        StructuralNode {
            id: format!("text_{:05}", position),
            section: section.map(String::from),
            page,
            position,
            degraded: false,
            payload: NodePayload::Text {
                text: format!("node {}", position),
            },
        }
    }

    fn sample_doc() -> SemanticDocument {
        let nodes = vec![
            text_node(0, Some("Item 1"), Some(3)),
            text_node(1, Some("Item 1"), Some(4)),
            text_node(2, Some("Item 1A"), Some(4)),
            text_node(3, Some("Item 1A"), Some(5)),
        ];
        SemanticDocument::new(FilingMeta::default(), nodes, vec![]).unwrap()
    }

    #[test]
    fn test_indices_agree_with_linear_order() {
        let doc = sample_doc();

        let item1 = doc.section_nodes("Item 1");
        assert_eq!(item1.len(), 2);
        assert!(item1[0].position < item1[1].position);

        let page4 = doc.nodes_on_page(4);
        assert_eq!(page4.len(), 2);
        assert_eq!(page4[0].position, 1);
        assert_eq!(page4[1].position, 2);

        assert_eq!(doc.nodes_of_kind(NodeKind::Text).len(), 4);
        assert!(doc.nodes_of_kind(NodeKind::Table).is_empty());
    }

    #[test]
    fn test_navigation() {
        let doc = sample_doc();

        assert_eq!(doc.next_node("text_00001").unwrap().position, 2);
        assert_eq!(doc.prev_node("text_00001").unwrap().position, 0);
        assert!(doc.prev_node("text_00000").is_none());
        assert!(doc.next_node("text_00003").is_none());
        assert!(doc.node("text_99999").is_none());
    }

    #[test]
    fn test_section_views_contiguous() {
        let doc = sample_doc();
        let views = doc.section_views();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].section, Some("Item 1"));
        assert_eq!(views[0].nodes.len(), 2);
        assert_eq!(views[1].section, Some("Item 1A"));
        assert_eq!(views[1].page_range(), Some((4, 5)));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut duplicate = text_node(1, None, None);
        duplicate.id = "text_00000".to_string();
        let nodes = vec![text_node(0, None, None), duplicate];

        let result = SemanticDocument::new(FilingMeta::default(), nodes, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_position_gap_rejected() {
        let nodes = vec![text_node(0, None, None), text_node(2, None, None)];
        let result = SemanticDocument::new(FilingMeta::default(), nodes, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_page_range() {
        let doc = sample_doc();
        assert_eq!(doc.page_range(), Some((3, 5)));
    }
}

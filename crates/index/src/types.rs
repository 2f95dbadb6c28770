//! Structural node and filing type definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Section identifier, e.g. "Item 7".
pub type SectionId = String;

/// Structural node identifier, derived from kind and document position
/// (e.g. "text_00012"). Deterministic: the same input always yields the
/// same ids.
pub type NodeId = String;

/// Source metadata for a single filing, as reported by the loader.
/// Sidecar files may carry any subset of the fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingMeta {
    /// Stable identifier for the filing, e.g. "AAPL-10-K-2024"
    pub filing_id: String,

    /// Company name, e.g. "Apple Inc."
    pub company: Option<String>,

    /// Ticker symbol, e.g. "AAPL"
    pub ticker: Option<String>,

    /// Form type, e.g. "10-K"
    pub form: Option<String>,

    /// Date the filing was submitted
    pub filing_date: Option<NaiveDate>,

    /// Period of report, e.g. "2024-12-31"
    pub period_of_report: Option<String>,

    /// Fiscal year
    pub year: Option<i32>,

    /// Accession number assigned by the regulator
    pub accession_number: Option<String>,

    /// Source document URL
    pub source_url: Option<String>,
}

/// Raw filing content plus metadata, as returned by a loader.
#[derive(Debug, Clone)]
pub struct RawFiling {
    /// The raw document body
    pub body: String,

    /// Source metadata
    pub meta: FilingMeta,
}

/// Structural node variant discriminant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Text,
    Table,
    Image,
}

impl NodeKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::Image => "image",
        }
    }
}

/// A single table cell addressed by its row and column header names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: String,
    pub column: String,
    pub value: String,
}

/// Structured table representation preserving header-to-cell
/// relationships. Row names are unique within a table (a positional suffix
/// disambiguates duplicates).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableContent {
    pub caption: String,
    pub column_names: Vec<String>,
    pub row_names: Vec<String>,
    pub cells: Vec<TableCell>,
}

impl TableContent {
    /// Full text rendering: caption plus every (row, column) -> value
    /// mapping, one per line.
    pub fn text(&self) -> String {
        let mut parts = Vec::with_capacity(self.cells.len() + 1);

        if !self.caption.is_empty() {
            parts.push(format!("Table Caption: {}", self.caption));
        }

        for cell in &self.cells {
            let value = cell.value.replace(['\n', '\r'], " ");
            parts.push(format!("({}, {}) -> {}", cell.row, cell.column, value));
        }

        parts.join("\n")
    }

    /// Minimal rendering: caption and header names only. Used where the
    /// full cell enumeration would blow a budget, e.g. overlap windows.
    pub fn min_text(&self) -> String {
        let mut parts = Vec::new();

        if !self.caption.is_empty() {
            parts.push(format!("Table Caption: {}", self.caption));
        }

        parts.push(format!("Columns: {}", self.column_names.join(", ")));
        parts.push(format!("Rows: {}", self.row_names.join(", ")));

        parts.join("\n")
    }
}

/// Variant-specific payload of a structural node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodePayload {
    /// Running text
    Text { text: String },

    /// A table with header semantics
    Table(TableContent),

    /// An image reference plus caption text
    Image { source: String, alt: String },
}

/// Smallest structural unit of a parsed filing.
///
/// Nodes are immutable once produced; `position` is strictly increasing in
/// document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralNode {
    /// Deterministic node identifier
    pub id: NodeId,

    /// Section this node belongs to, when one was identified
    pub section: Option<SectionId>,

    /// Page number derived from page-footer markers
    pub page: Option<u32>,

    /// Position index within the document (0-based, gap-free)
    pub position: u32,

    /// True when a malformed segment fell back to a flattened
    /// representation
    pub degraded: bool,

    /// Variant-specific content
    pub payload: NodePayload,
}

impl StructuralNode {
    /// The variant discriminant.
    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            NodePayload::Text { .. } => NodeKind::Text,
            NodePayload::Table(_) => NodeKind::Table,
            NodePayload::Image { .. } => NodeKind::Image,
        }
    }

    /// Assembled text content of this node.
    pub fn text(&self) -> String {
        match &self.payload {
            NodePayload::Text { text } => text.clone(),
            NodePayload::Table(table) => table.text(),
            NodePayload::Image { source, alt } => image_text(source, alt),
        }
    }

    /// Minimal text stand-in for this node, used for overlap windows.
    /// Text nodes have no reduced form; tables and images do.
    pub fn min_text(&self) -> String {
        match &self.payload {
            NodePayload::Text { text } => text.clone(),
            NodePayload::Table(table) => table.min_text(),
            NodePayload::Image { source, alt } => image_text(source, alt),
        }
    }

    /// Content length in characters.
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// Bracketed placeholder for an image node's content.
fn image_text(source: &str, alt: &str) -> String {
    let mut parts = Vec::new();

    if !alt.is_empty() {
        parts.push(format!("Image description: {}", alt));
    }

    if !source.is_empty() {
        parts.push(format!("Image source: {}", source));
    }

    if parts.is_empty() {
        "[Image content]".to_string()
    } else {
        format!("[{}]", parts.join(" "))
    }
}

/// A non-fatal problem recorded while parsing. Warnings ride along on the
/// document so downstream consumers can audit quality without the
/// pipeline failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseWarning {
    /// Position of the affected node, when one exists
    pub position: Option<u32>,

    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TableContent {
        TableContent {
            caption: "Net sales".to_string(),
            column_names: vec!["2024".to_string(), "2023".to_string()],
            row_names: vec!["iPhone (1)".to_string(), "Mac (2)".to_string()],
            cells: vec![
                TableCell {
                    row: "iPhone (1)".to_string(),
                    column: "2024".to_string(),
                    value: "$201,183".to_string(),
                },
                TableCell {
                    row: "Mac (2)".to_string(),
                    column: "2023".to_string(),
                    value: "$29,357".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_table_text_enumerates_cells() {
        let text = sample_table().text();
        assert!(text.contains("Table Caption: Net sales"));
        assert!(text.contains("(iPhone (1), 2024) -> $201,183"));
        assert!(text.contains("(Mac (2), 2023) -> $29,357"));
    }

    #[test]
    fn test_table_min_text_headers_only() {
        let min = sample_table().min_text();
        assert!(min.contains("Columns: 2024, 2023"));
        assert!(min.contains("Rows: iPhone (1), Mac (2)"));
        assert!(!min.contains("$201,183"));
    }

    #[test]
    fn test_node_kind_matches_payload() {
        let node = StructuralNode {
            id: "image_00003".to_string(),
            section: None,
            page: None,
            position: 3,
            degraded: false,
            payload: NodePayload::Image {
                source: "chart.jpg".to_string(),
                alt: "Revenue chart".to_string(),
            },
        };
        assert_eq!(node.kind(), NodeKind::Image);
        assert!(node.text().starts_with('['));
        assert!(node.text().contains("Revenue chart"));
    }

    #[test]
    fn test_char_len_counts_chars_not_bytes() {
        let node = StructuralNode {
            id: "text_00000".to_string(),
            section: None,
            page: None,
            position: 0,
            degraded: false,
            payload: NodePayload::Text {
                text: "é".repeat(10),
            },
        };
        assert_eq!(node.char_len(), 10);
    }
}

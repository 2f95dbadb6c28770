//! Table structure extraction.
//!
//! Derives a structured representation from an HTML table that preserves
//! header-to-cell relationships instead of flattening to text: column
//! names come from the header row (colspan-expanded, duplicates
//! disambiguated), row names from the first column (position-suffixed so
//! they stay unique), and each non-empty cell is addressed by its
//! (row, column) pair.
//!
//! Returns `Err` with a reason when no usable structure can be derived;
//! the caller degrades the segment to flattened text.

use super::{attr_value, collapse_text, find_ci};
use crate::types::{TableCell, TableContent};

/// One raw `<td>`/`<th>` cell.
struct RawCell {
    text: String,
    colspan: usize,
    is_header: bool,
}

/// One `<tr>` row.
struct RawRow {
    cells: Vec<RawCell>,
}

impl RawRow {
    /// A row looks like a header when it contains `<th>` cells or bold
    /// styling.
    fn is_header(&self, src: &str) -> bool {
        self.cells.iter().any(|c| c.is_header)
            || find_ci(src, "<b>", 0).is_some()
            || find_ci(src, "<strong", 0).is_some()
            || find_ci(src, "font-weight:700", 0).is_some()
            || find_ci(src, "font-weight:bold", 0).is_some()
    }
}

/// Parse a `<table>...</table>` segment into structured content.
pub(crate) fn parse_table(src: &str) -> Result<TableContent, String> {
    let caption = extract_caption(src);

    let row_sources = extract_rows(src);
    if row_sources.is_empty() {
        return Err("no rows".to_string());
    }

    let rows: Vec<RawRow> = row_sources.iter().map(|r| extract_cells(r)).collect();

    // First header-looking row wins; fall back to row 0
    let header_idx = rows
        .iter()
        .zip(&row_sources)
        .position(|(row, src)| row.is_header(src))
        .unwrap_or(0);

    let columns = header_columns(&rows[header_idx]);
    if columns.is_empty() {
        return Err("no header columns".to_string());
    }

    let mut row_names = Vec::new();
    let mut cells = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        if i == header_idx {
            continue;
        }

        let grid = expand_data_row(row);
        if grid.iter().all(|v| v.is_empty()) {
            continue;
        }

        // First cell is the row name; a positional suffix keeps duplicate
        // names distinct
        let base_name = if grid[0].is_empty() {
            format!("Row_{}", i)
        } else {
            grid[0].clone()
        };
        let row_name = format!("{} ({})", base_name, i);
        let name_span = row.cells.first().map(|c| c.colspan).unwrap_or(1);

        for column in &columns {
            if column.name_hidden {
                continue;
            }
            let value = merge_span(&grid, column.start.max(name_span), column.end);
            if value.is_empty() {
                continue;
            }
            cells.push(TableCell {
                row: row_name.clone(),
                column: column.name.clone(),
                value,
            });
        }

        row_names.push(row_name);
    }

    if row_names.is_empty() {
        return Err("no data rows".to_string());
    }

    let column_names: Vec<String> = columns
        .iter()
        .filter(|c| !c.name_hidden)
        .map(|c| c.name.clone())
        .collect();
    if column_names.is_empty() {
        return Err("only empty header columns".to_string());
    }

    Ok(TableContent {
        caption,
        column_names,
        row_names,
        cells,
    })
}

/// A header cell projected onto the expanded grid.
struct Column {
    name: String,
    /// Empty header cells produce unnamed spacer columns, excluded from
    /// the structured output
    name_hidden: bool,
    /// Grid column range covered by this header (colspan expansion)
    start: usize,
    end: usize,
}

/// Build named columns from the header row, expanding colspan and
/// disambiguating duplicate names.
fn header_columns(header: &RawRow) -> Vec<Column> {
    let mut total_counts = std::collections::HashMap::new();
    for cell in &header.cells {
        if !cell.text.is_empty() {
            *total_counts.entry(cell.text.as_str()).or_insert(0usize) += 1;
        }
    }

    let mut seen = std::collections::HashMap::new();
    let mut columns = Vec::new();
    let mut grid_pos = 0;

    for cell in &header.cells {
        let start = grid_pos;
        grid_pos += cell.colspan;

        if cell.text.is_empty() {
            columns.push(Column {
                name: String::new(),
                name_hidden: true,
                start,
                end: grid_pos,
            });
            continue;
        }

        let occurrence = seen.entry(cell.text.clone()).or_insert(0usize);
        *occurrence += 1;
        let name = if total_counts[cell.text.as_str()] > 1 {
            format!("{} ({})", cell.text, occurrence)
        } else {
            cell.text.clone()
        };

        columns.push(Column {
            name,
            name_hidden: false,
            start,
            end: grid_pos,
        });
    }

    columns
}

/// Expand a data row into grid columns: cell text lands in the first
/// position of its colspan, remaining positions stay empty.
fn expand_data_row(row: &RawRow) -> Vec<String> {
    let mut grid = Vec::new();
    for cell in &row.cells {
        grid.push(cell.text.clone());
        for _ in 1..cell.colspan {
            grid.push(String::new());
        }
    }
    grid
}

/// Join the non-empty grid values under one header span. Currency markers
/// split across cells reassemble here ("$" + "34,550" -> "$34,550").
fn merge_span(grid: &[String], start: usize, end: usize) -> String {
    let mut merged = String::new();
    for value in grid.iter().take(end.min(grid.len())).skip(start) {
        merged.push_str(value.trim());
    }
    merged
}

/// Extract the `<caption>` text, if any.
fn extract_caption(src: &str) -> String {
    let Some(start) = find_ci(src, "<caption", 0) else {
        return String::new();
    };
    let Some(open_end) = src[start..].find('>').map(|e| start + e + 1) else {
        return String::new();
    };
    let end = find_ci(src, "</caption", open_end).unwrap_or(src.len());
    collapse_text(&src[open_end..end])
}

/// Slice out each `<tr>...</tr>` row.
fn extract_rows(src: &str) -> Vec<&str> {
    let mut rows = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_ci(src, "<tr", pos) {
        let content_start = match src[start..].find('>') {
            Some(e) => start + e + 1,
            None => break,
        };
        let end = find_ci(src, "</tr", content_start).unwrap_or(src.len());
        rows.push(&src[content_start..end]);
        pos = end + 1;
    }

    rows
}

/// Extract the cells of one row.
fn extract_cells(row_src: &str) -> RawRow {
    let mut cells = Vec::new();
    let mut pos = 0;

    loop {
        let next_td = find_ci(row_src, "<td", pos);
        let next_th = find_ci(row_src, "<th", pos);

        let (start, is_header) = match (next_td, next_th) {
            (Some(d), Some(h)) if d <= h => (d, false),
            (Some(d), None) => (d, false),
            (_, Some(h)) => (h, true),
            (None, None) => break,
        };

        let tag_end = match row_src[start..].find('>') {
            Some(e) => start + e + 1,
            None => break,
        };
        let tag_src = &row_src[start..tag_end];

        let closing = if is_header { "</th" } else { "</td" };
        let content_end = find_ci(row_src, closing, tag_end)
            .or_else(|| find_ci(row_src, "<td", tag_end))
            .or_else(|| find_ci(row_src, "<th", tag_end))
            .unwrap_or(row_src.len());

        let colspan = attr_value(tag_src, "colspan")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(1);

        cells.push(RawCell {
            text: collapse_text(&row_src[tag_end..content_end]),
            colspan,
            is_header,
        });

        pos = content_end;
    }

    RawRow { cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENT_TABLE: &str = r#"<table>
<caption>Net sales by segment</caption>
<tr><th>Segment</th><th>2024</th><th>2023</th></tr>
<tr><td>Americas</td><td>$167,045</td><td>$162,560</td></tr>
<tr><td>Europe</td><td>$101,328</td><td>$94,294</td></tr>
</table>"#;

    #[test]
    fn test_parse_table_basic() {
        let table = parse_table(SEGMENT_TABLE).unwrap();

        assert_eq!(table.caption, "Net sales by segment");
        assert_eq!(table.column_names, vec!["Segment", "2024", "2023"]);
        assert_eq!(table.row_names, vec!["Americas (1)", "Europe (2)"]);

        let cell = table
            .cells
            .iter()
            .find(|c| c.row == "Americas (1)" && c.column == "2024")
            .unwrap();
        assert_eq!(cell.value, "$167,045");
    }

    #[test]
    fn test_parse_table_colspan_merge() {
        let src = r#"<table>
<tr><th>Product</th><th colspan="2">2024</th></tr>
<tr><td>iPhone</td><td>$</td><td>201,183</td></tr>
</table>"#;
        let table = parse_table(src).unwrap();

        let cell = table
            .cells
            .iter()
            .find(|c| c.row == "iPhone (1)" && c.column == "2024")
            .unwrap();
        assert_eq!(cell.value, "$201,183");
    }

    #[test]
    fn test_parse_table_duplicate_headers() {
        let src = r#"<table>
<tr><th>Metric</th><th>Change</th><th>Change</th></tr>
<tr><td>Revenue</td><td>5%</td><td>7%</td></tr>
</table>"#;
        let table = parse_table(src).unwrap();

        assert!(table.column_names.contains(&"Change (1)".to_string()));
        assert!(table.column_names.contains(&"Change (2)".to_string()));
        let first = table
            .cells
            .iter()
            .find(|c| c.column == "Change (1)")
            .unwrap();
        assert_eq!(first.value, "5%");
    }

    #[test]
    fn test_parse_table_bold_header_detection() {
        let src = r#"<table>
<tr><td><b>Year</b></td><td><b>Total</b></td></tr>
<tr><td>2024</td><td>$391,035</td></tr>
</table>"#;
        let table = parse_table(src).unwrap();
        assert_eq!(table.column_names, vec!["Year", "Total"]);
        assert_eq!(table.row_names, vec!["2024 (1)"]);
    }

    #[test]
    fn test_parse_table_no_rows_errors() {
        assert!(parse_table("<table>nothing here</table>").is_err());
    }

    #[test]
    fn test_parse_table_header_only_errors() {
        let src = "<table><tr><th>Only</th><th>Header</th></tr></table>";
        assert!(parse_table(src).is_err());
    }

    #[test]
    fn test_parse_table_empty_header_cells_hidden() {
        let src = r#"<table>
<tr><th>Name</th><th></th><th>Value</th></tr>
<tr><td>Cash</td><td>spacer</td><td>$29,943</td></tr>
</table>"#;
        let table = parse_table(src).unwrap();
        assert_eq!(table.column_names, vec!["Name", "Value"]);
        assert!(table.cells.iter().all(|c| c.value != "spacer"));
    }
}

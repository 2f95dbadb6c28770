//! Structural parsing of raw filing bodies.
//!
//! Segments an EDGAR-style HTML document into typed structural nodes:
//! running text, tables with header semantics, and image references.
//! Page-footer and decorative segments are recognized, used to enrich the
//! surviving nodes (page numbers), and then consumed.
//!
//! Parsing never aborts a filing: unrecognized segments degrade to text
//! nodes, undecodable tables degrade to flattened text flagged
//! `degraded=true`, and every problem is recorded as a warning.

mod table;

use crate::sections;
use crate::types::{NodePayload, ParseWarning, StructuralNode, TableContent};

/// Result of parsing a raw filing body.
#[derive(Debug)]
pub struct ParseOutcome {
    /// Structural nodes in document order, positions 0..n gap-free
    pub nodes: Vec<StructuralNode>,

    /// Non-fatal problems encountered while parsing
    pub warnings: Vec<ParseWarning>,
}

/// Top-level segment of the raw body.
enum Segment<'a> {
    /// Anything that is not a table or image tag
    Markup(&'a str),
    Table(&'a str),
    Image(&'a str),
}

/// Classified segment, prior to page enrichment and cleanup.
enum PreNode {
    Text {
        text: String,
    },
    Table {
        content: TableContent,
    },
    /// A table whose structure could not be derived, flattened to text
    DegradedTable {
        text: String,
        reason: String,
    },
    Image {
        source: String,
        alt: String,
    },
    /// Carries the page number for enrichment, then dropped
    PageFooter {
        page: u32,
    },
    /// Decorative or empty markup, dropped after counting
    NonContent,
}

/// Parse a raw filing body into ordered structural nodes.
///
/// Pure transform: no side effects beyond tracing output.
pub fn parse(body: &str) -> ParseOutcome {
    let prenodes = classify_segments(body);

    // Every node takes the page number of the next footer at or after it
    let mut pages = vec![None; prenodes.len()];
    let mut next_footer = None;
    for (i, prenode) in prenodes.iter().enumerate().rev() {
        if let PreNode::PageFooter { page } = prenode {
            next_footer = Some(*page);
        }
        pages[i] = next_footer;
    }

    let mut nodes = Vec::new();
    let mut warnings = Vec::new();
    let mut current_section: Option<String> = None;
    let mut footer_count = 0usize;
    let mut non_content_count = 0usize;

    for (i, prenode) in prenodes.into_iter().enumerate() {
        let position = nodes.len() as u32;
        let page = pages[i];

        match prenode {
            PreNode::PageFooter { .. } => footer_count += 1,
            PreNode::NonContent => non_content_count += 1,
            PreNode::Text { text } => {
                // A heading opens a new section and belongs to it
                if let Some(heading) = sections::parse_heading(&text) {
                    current_section = Some(heading);
                }
                nodes.push(StructuralNode {
                    id: format!("text_{:05}", position),
                    section: current_section.clone(),
                    page,
                    position,
                    degraded: false,
                    payload: NodePayload::Text { text },
                });
            }
            PreNode::Table { content } => {
                nodes.push(StructuralNode {
                    id: format!("table_{:05}", position),
                    section: current_section.clone(),
                    page,
                    position,
                    degraded: false,
                    payload: NodePayload::Table(content),
                });
            }
            PreNode::DegradedTable { text, reason } => {
                warnings.push(ParseWarning {
                    position: Some(position),
                    message: format!("table degraded to flattened text: {}", reason),
                });
                nodes.push(StructuralNode {
                    id: format!("text_{:05}", position),
                    section: current_section.clone(),
                    page,
                    position,
                    degraded: true,
                    payload: NodePayload::Text { text },
                });
            }
            PreNode::Image { source, alt } => {
                nodes.push(StructuralNode {
                    id: format!("image_{:05}", position),
                    section: current_section.clone(),
                    page,
                    position,
                    degraded: false,
                    payload: NodePayload::Image { source, alt },
                });
            }
        }
    }

    tracing::debug!(
        "Parsed {} structural nodes ({} warnings, {} page footers and {} non-content segments consumed)",
        nodes.len(),
        warnings.len(),
        footer_count,
        non_content_count
    );

    ParseOutcome { nodes, warnings }
}

/// Split the body into segments and classify each one.
fn classify_segments(body: &str) -> Vec<PreNode> {
    let mut prenodes = Vec::new();

    for segment in segment(body) {
        match segment {
            Segment::Markup(src) => {
                let stripped = strip_markup(src);
                let mut any = false;
                for paragraph in paragraphs(&stripped) {
                    any = true;
                    if let Some(page) = parse_page_footer(&paragraph) {
                        prenodes.push(PreNode::PageFooter { page });
                    } else {
                        prenodes.push(PreNode::Text { text: paragraph });
                    }
                }
                if !any && !src.trim().is_empty() {
                    prenodes.push(PreNode::NonContent);
                }
            }
            Segment::Table(src) => match table::parse_table(src) {
                Ok(content) => prenodes.push(PreNode::Table { content }),
                Err(reason) => {
                    let text = collapse_text(src);
                    if text.is_empty() {
                        prenodes.push(PreNode::NonContent);
                    } else {
                        prenodes.push(PreNode::DegradedTable { text, reason });
                    }
                }
            },
            Segment::Image(tag) => {
                let (source, alt) = image_attrs(tag);
                prenodes.push(PreNode::Image { source, alt });
            }
        }
    }

    prenodes
}

/// Split the body along table and image tag boundaries.
fn segment(body: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < body.len() {
        let next_table = find_ci(body, "<table", pos);
        let next_image = find_ci(body, "<img", pos);

        let (start, is_table) = match (next_table, next_image) {
            (Some(t), Some(i)) if t <= i => (t, true),
            (Some(t), None) => (t, true),
            (_, Some(i)) => (i, false),
            (None, None) => {
                segments.push(Segment::Markup(&body[pos..]));
                break;
            }
        };

        if start > pos {
            segments.push(Segment::Markup(&body[pos..start]));
        }

        if is_table {
            let end = find_ci(body, "</table>", start)
                .map(|e| e + "</table>".len())
                .unwrap_or(body.len());
            segments.push(Segment::Table(&body[start..end]));
            pos = end;
        } else {
            let end = body[start..]
                .find('>')
                .map(|e| start + e + 1)
                .unwrap_or(body.len());
            segments.push(Segment::Image(&body[start..end]));
            pos = end;
        }
    }

    segments
}

/// ASCII case-insensitive substring search. Needles are ASCII by
/// construction.
pub(crate) fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|p| p + from)
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Closing tags that end a block of running text.
const BLOCK_BREAKS: &[&str] = &[
    "</p", "</div", "</tr", "</li", "</ul", "</ol", "</h1", "</h2", "</h3", "</h4", "</h5",
    "</h6", "<br",
];

/// Strip tags from markup, inserting newlines at block boundaries so
/// paragraphs survive the stripping. Script and style bodies contribute
/// nothing.
fn strip_markup(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut i = 0;

    while i < src.len() {
        if src.as_bytes()[i] == b'<' {
            let rest = &src[i..];

            if starts_with_ci(rest, "<script") || starts_with_ci(rest, "<style") {
                let closing = if starts_with_ci(rest, "<script") {
                    "</script"
                } else {
                    "</style"
                };
                let close_start = find_ci(src, closing, i).unwrap_or(src.len());
                i = src[close_start..]
                    .find('>')
                    .map(|e| close_start + e + 1)
                    .unwrap_or(src.len());
                continue;
            }

            let tag_end = rest.find('>').map(|e| i + e + 1).unwrap_or(src.len());
            if BLOCK_BREAKS.iter().any(|b| starts_with_ci(rest, b)) {
                out.push('\n');
            }
            i = tag_end;
        } else if let Some(ch) = src[i..].chars().next() {
            out.push(ch);
            i += ch.len_utf8();
        } else {
            break;
        }
    }

    decode_entities(&out)
}

/// Decode the handful of entities that actually occur in filings.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace('\u{a0}', " ")
}

/// Strip tags and collapse all whitespace to single spaces. Used for
/// table cells and flattened fallbacks.
pub(crate) fn collapse_text(src: &str) -> String {
    strip_markup(src)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split stripped text into whitespace-normalized paragraphs.
fn paragraphs(stripped: &str) -> Vec<String> {
    stripped
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Recognize a page footer of the form
/// `<company> | <year> Form 10-K | <page>` and extract the page number.
fn parse_page_footer(paragraph: &str) -> Option<u32> {
    let parts: Vec<&str> = paragraph.split('|').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }

    let page = parts.last()?.parse::<u32>().ok()?;

    let form_part = parts[parts.len() - 2];
    let year: String = form_part.chars().take_while(|c| c.is_ascii_digit()).collect();
    if year.len() != 4 || find_ci(form_part, "form", 0).is_none() {
        return None;
    }

    Some(page)
}

/// Pull `src` and `alt` attributes out of an image tag.
fn image_attrs(tag: &str) -> (String, String) {
    (
        attr_value(tag, "src").unwrap_or_default(),
        attr_value(tag, "alt").unwrap_or_default(),
    )
}

/// Extract a quoted attribute value from a tag's source.
pub(crate) fn attr_value(tag: &str, name: &str) -> Option<String> {
    let mut from = 0;
    loop {
        let at = find_ci(tag, name, from)?;

        // Must be a standalone attribute name, not a substring
        let before_ok = at == 0 || !tag.as_bytes()[at - 1].is_ascii_alphanumeric();
        let after = tag[at + name.len()..].trim_start();
        if !before_ok || !after.starts_with('=') {
            from = at + name.len();
            continue;
        }

        let value = after[1..].trim_start();
        let (quote, rest) = match value.chars().next() {
            Some(q @ ('"' | '\'')) => (Some(q), &value[1..]),
            Some(_) => (None, value),
            None => return None,
        };

        let end = match quote {
            Some(q) => rest.find(q).unwrap_or(rest.len()),
            None => rest
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len()),
        };

        return Some(rest[..end].to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    const SAMPLE: &str = r#"
<div><p>Item 1. Business</p></div>
<div><p>The Company designs and sells consumer electronics.</p></div>
<table><tr><th>Segment</th><th>2024</th></tr>
<tr><td>Americas</td><td>$167,045</td></tr></table>
<img src="chart.jpg" alt="Revenue by region">
<div>Acme Corp | 2024 Form 10-K | 12</div>
<div><p>Item 1A. Risk Factors</p></div>
<div><p>Our business is subject to a variety of risks.</p></div>
<div>Acme Corp | 2024 Form 10-K | 13</div>
"#;

    #[test]
    fn test_parse_classifies_variants() {
        let outcome = parse(SAMPLE);
        let kinds: Vec<NodeKind> = outcome.nodes.iter().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Text,
                NodeKind::Text,
                NodeKind::Table,
                NodeKind::Image,
                NodeKind::Text,
                NodeKind::Text,
            ]
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_parse_positions_gap_free() {
        let outcome = parse(SAMPLE);
        for (i, node) in outcome.nodes.iter().enumerate() {
            assert_eq!(node.position, i as u32);
            assert!(node.id.ends_with(&format!("{:05}", i)));
        }
    }

    #[test]
    fn test_parse_assigns_sections() {
        let outcome = parse(SAMPLE);
        assert_eq!(outcome.nodes[0].section.as_deref(), Some("Item 1"));
        assert_eq!(outcome.nodes[2].section.as_deref(), Some("Item 1"));
        assert_eq!(outcome.nodes[4].section.as_deref(), Some("Item 1A"));
        assert_eq!(outcome.nodes[5].section.as_deref(), Some("Item 1A"));
    }

    #[test]
    fn test_parse_assigns_pages_from_next_footer() {
        let outcome = parse(SAMPLE);
        // Everything before the first footer is on page 12
        assert_eq!(outcome.nodes[0].page, Some(12));
        assert_eq!(outcome.nodes[3].page, Some(12));
        // The risk factors section sits before the page 13 footer
        assert_eq!(outcome.nodes[4].page, Some(13));
    }

    #[test]
    fn test_footers_are_consumed() {
        let outcome = parse(SAMPLE);
        assert!(outcome
            .nodes
            .iter()
            .all(|n| !n.text().contains("Form 10-K")));
    }

    #[test]
    fn test_undecodable_table_degrades() {
        let body = "<p>Before</p><table>no rows at all</table><p>After</p>";
        let outcome = parse(body);

        assert_eq!(outcome.nodes.len(), 3);
        assert_eq!(outcome.nodes[1].kind(), NodeKind::Text);
        assert!(outcome.nodes[1].degraded);
        assert!(outcome.nodes[1].text().contains("no rows at all"));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].position, Some(1));
    }

    #[test]
    fn test_plain_text_body() {
        let outcome = parse("Just a paragraph of plain text.");
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(outcome.nodes[0].kind(), NodeKind::Text);
        assert_eq!(outcome.nodes[0].section, None);
    }

    #[test]
    fn test_empty_body() {
        let outcome = parse("");
        assert!(outcome.nodes.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_page_footer_pattern() {
        assert_eq!(parse_page_footer("Acme Corp | 2024 Form 10-K | 7"), Some(7));
        assert_eq!(parse_page_footer("Acme | 2024 Form 10-K | notanumber"), None);
        assert_eq!(parse_page_footer("a | b | 7"), None);
        assert_eq!(parse_page_footer("Plain sentence with no separators"), None);
    }

    #[test]
    fn test_attr_value_quoting() {
        assert_eq!(
            attr_value(r#"<img src="a.png" alt='Chart'>"#, "src"),
            Some("a.png".to_string())
        );
        assert_eq!(
            attr_value(r#"<img src="a.png" alt='Chart'>"#, "alt"),
            Some("Chart".to_string())
        );
        assert_eq!(attr_value("<img src=bare.png>", "src"), Some("bare.png".to_string()));
        assert_eq!(attr_value("<img>", "src"), None);
    }

    #[test]
    fn test_strip_markup_skips_script() {
        let out = strip_markup("<p>keep</p><script>var x = 1;</script><p>also</p>");
        assert!(out.contains("keep"));
        assert!(out.contains("also"));
        assert!(!out.contains("var x"));
    }
}

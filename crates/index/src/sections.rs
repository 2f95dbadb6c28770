//! Registry of known filing sections.
//!
//! Covers the standard 10-K item layout. Unknown headings still open a
//! section; the registry only adds display names and descriptions for
//! chunk metadata enrichment.

/// Descriptive information for a known section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    /// Canonical id, e.g. "Item 7"
    pub id: &'static str,

    /// Internal identifier, e.g. "mdna"
    pub technical_name: &'static str,

    /// Human-readable name
    pub display_name: &'static str,

    /// Business meaning
    pub description: &'static str,
}

pub const SECTIONS: &[SectionInfo] = &[
    SectionInfo {
        id: "Item 1",
        technical_name: "business",
        display_name: "Business",
        description: "Overview of the company's operations, products, services, and strategy",
    },
    SectionInfo {
        id: "Item 1A",
        technical_name: "risk_factors",
        display_name: "Risk Factors",
        description: "Material risks that could affect the company's business or financial condition",
    },
    SectionInfo {
        id: "Item 1B",
        technical_name: "unresolved_staff_comments",
        display_name: "Unresolved Staff Comments",
        description: "Comments from the regulator's staff that remain unresolved",
    },
    SectionInfo {
        id: "Item 1C",
        technical_name: "cybersecurity",
        display_name: "Cybersecurity",
        description: "Company cybersecurity risk management, strategy, and governance",
    },
    SectionInfo {
        id: "Item 2",
        technical_name: "properties",
        display_name: "Properties",
        description: "Description of principal properties owned or leased",
    },
    SectionInfo {
        id: "Item 3",
        technical_name: "legal_proceedings",
        display_name: "Legal Proceedings",
        description: "Material pending legal proceedings",
    },
    SectionInfo {
        id: "Item 4",
        technical_name: "mine_safety",
        display_name: "Mine Safety Disclosures",
        description: "Mine safety information (typically not applicable)",
    },
    SectionInfo {
        id: "Item 5",
        technical_name: "market_information",
        display_name: "Market for Registrant's Common Equity",
        description: "Market information, dividends, and issuer purchases of equity securities",
    },
    SectionInfo {
        id: "Item 6",
        technical_name: "selected_financial_data",
        display_name: "Selected Financial Data",
        description: "Historical financial highlights (largely deprecated but still present)",
    },
    SectionInfo {
        id: "Item 7",
        technical_name: "mdna",
        display_name: "Management's Discussion and Analysis",
        description: "Management's perspective on financial condition and results of operations",
    },
    SectionInfo {
        id: "Item 7A",
        technical_name: "quantitative_market_risk",
        display_name: "Quantitative and Qualitative Disclosures About Market Risk",
        description: "Exposure to market risk such as interest rates, FX, or commodity prices",
    },
    SectionInfo {
        id: "Item 8",
        technical_name: "financial_statements",
        display_name: "Financial Statements and Supplementary Data",
        description: "Audited financial statements and notes",
    },
    SectionInfo {
        id: "Item 9",
        technical_name: "accounting_changes",
        display_name: "Changes in and Disagreements with Accountants",
        description: "Changes in accountants and accounting disagreements",
    },
    SectionInfo {
        id: "Item 9A",
        technical_name: "controls_and_procedures",
        display_name: "Controls and Procedures",
        description: "Disclosure controls and internal control over financial reporting",
    },
    SectionInfo {
        id: "Item 9B",
        technical_name: "other_information",
        display_name: "Other Information",
        description: "Information not required elsewhere",
    },
    SectionInfo {
        id: "Item 9C",
        technical_name: "foreign_jurisdiction_disclosure",
        display_name: "Disclosure Regarding Foreign Jurisdictions",
        description: "Disclosure related to foreign jurisdiction restrictions",
    },
    SectionInfo {
        id: "Item 10",
        technical_name: "directors_and_officers",
        display_name: "Directors, Executive Officers and Corporate Governance",
        description: "Information about directors, officers, and governance",
    },
    SectionInfo {
        id: "Item 11",
        technical_name: "executive_compensation",
        display_name: "Executive Compensation",
        description: "Compensation of executive officers",
    },
    SectionInfo {
        id: "Item 12",
        technical_name: "security_ownership",
        display_name: "Security Ownership of Certain Beneficial Owners",
        description: "Equity ownership by management and major shareholders",
    },
    SectionInfo {
        id: "Item 13",
        technical_name: "related_transactions",
        display_name: "Certain Relationships and Related Transactions",
        description: "Related-party transactions",
    },
    SectionInfo {
        id: "Item 14",
        technical_name: "accountant_fees",
        display_name: "Principal Accountant Fees and Services",
        description: "Fees paid to the principal accountant",
    },
    SectionInfo {
        id: "Item 15",
        technical_name: "exhibits",
        display_name: "Exhibits and Financial Statement Schedules",
        description: "List of exhibits and schedules",
    },
    SectionInfo {
        id: "Item 16",
        technical_name: "form_10k_summary",
        display_name: "Form 10-K Summary",
        description: "Optional summary of the Form 10-K",
    },
];

/// Look up a section by its canonical id.
pub fn lookup(id: &str) -> Option<&'static SectionInfo> {
    SECTIONS.iter().find(|s| s.id == id)
}

/// Maximum length of a paragraph still considered a heading candidate.
/// Running text that merely opens with "Item 8 ..." is longer than this.
const MAX_HEADING_LEN: usize = 120;

/// Try to read a section heading from a text paragraph.
///
/// Recognizes "Item <number>[letter]" at the start of a short paragraph,
/// case-insensitively, and returns the canonical section id ("Item 7A").
pub fn parse_heading(paragraph: &str) -> Option<String> {
    let trimmed = paragraph.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_HEADING_LEN {
        return None;
    }

    let lower = trimmed.to_lowercase();
    let rest = lower.strip_prefix("item")?;
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let rest = rest.trim_start();

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    // Item sub-letters run A through C in practice
    let after_digits = &rest[digits.len()..];
    let letter = after_digits.chars().next().filter(|c| ('a'..='c').contains(c));

    // The heading must end or continue with punctuation/whitespace after
    // the item number; "Item 10x" is not a heading.
    let tail_start = digits.len() + letter.map(|c| c.len_utf8()).unwrap_or(0);
    let tail = &rest[tail_start..];
    if !tail.is_empty() && !tail.starts_with(|c: char| c.is_whitespace() || ".:—-".contains(c)) {
        return None;
    }

    let mut id = format!("Item {}", digits);
    if let Some(letter) = letter {
        id.push(letter.to_ascii_uppercase());
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_section() {
        let info = lookup("Item 7").unwrap();
        assert_eq!(info.technical_name, "mdna");
    }

    #[test]
    fn test_lookup_unknown_section() {
        assert!(lookup("Item 99").is_none());
    }

    #[test]
    fn test_parse_heading_plain() {
        assert_eq!(parse_heading("Item 1. Business"), Some("Item 1".to_string()));
        assert_eq!(parse_heading("ITEM 7A."), Some("Item 7A".to_string()));
        assert_eq!(
            parse_heading("item 9b — Other Information"),
            Some("Item 9B".to_string())
        );
    }

    #[test]
    fn test_parse_heading_rejects_running_text() {
        let long = format!("Item 8 {}", "financial statements follow. ".repeat(10));
        assert_eq!(parse_heading(&long), None);
        assert_eq!(parse_heading("Items are discussed below"), None);
        assert_eq!(parse_heading("Item 10x"), None);
        assert_eq!(parse_heading(""), None);
    }
}

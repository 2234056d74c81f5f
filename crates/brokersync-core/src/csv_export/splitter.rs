use std::fmt::{Display, Formatter};

use crate::IngestError;

/// Logical sub-tables found in institution CSV exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionName {
    AccountStats,
    Cash,
    Holdings,
    Transactions,
}

impl SectionName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountStats => "account stats",
            Self::Cash => "cash",
            Self::Holdings => "holdings",
            Self::Transactions => "transactions",
        }
    }
}

impl Display for SectionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal header text that opens a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMarker {
    pub name: SectionName,
    pub marker: String,
}

impl SectionMarker {
    pub fn new(name: SectionName, marker: impl Into<String>) -> Self {
        Self {
            name,
            marker: marker.into(),
        }
    }
}

pub const RBCDI_ACCOUNT_STATS_HEADER: &str = ",Trailing 12 Mo Return,Unrealized Gain/Loss in CAD,Unrealized Gain/Loss in CAD (%),Combined Book Cost in CAD,Combined Book Cost in USD,Combined Total in CAD,Combined Total in USD";
pub const RBCDI_CASH_HEADER: &str = "Currency,Cash,Investments,Total";
pub const RBCDI_HOLDINGS_HEADER: &str = ",Product,Symbol,Name,Quantity,Last Price,Currency,Change $,Change %,Total Book Cost,Total Market Value,Unrealized Gain/Loss $,Unrealized Gain/Loss %,Average Cost,Annual Dividend Amount $,Dividend Ex Date,Load Type,RSP Eligibility,Automatic Investment Plan,DRIP Eligibility,Coupon Rate,Maturity Date,Expiration Date,Open Interest";
pub const RBCDI_HOLDINGS_FOOTER: &str = "Important Information";
pub const RBCDI_TRANSACTIONS_HEADER: &str =
    "Date,Activity,Symbol,Quantity,Price,Settlement Date,Account,Value,Currency,Description";
pub const RBCDI_ACTIVITY_FOOTER: &str = "Disclaimer";

/// Ordered marker table describing a composite export. Format drift is a
/// change to this table, not to the splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    pub markers: Vec<SectionMarker>,
    /// Text from the footer onward is discarded; a missing footer keeps the
    /// whole document.
    pub footer: Option<String>,
}

impl ExportLayout {
    pub fn rbcdi_holdings() -> Self {
        Self {
            markers: vec![
                SectionMarker::new(SectionName::AccountStats, RBCDI_ACCOUNT_STATS_HEADER),
                SectionMarker::new(SectionName::Cash, RBCDI_CASH_HEADER),
                SectionMarker::new(SectionName::Holdings, RBCDI_HOLDINGS_HEADER),
            ],
            footer: Some(String::from(RBCDI_HOLDINGS_FOOTER)),
        }
    }

    pub fn rbcdi_activity() -> Self {
        Self {
            markers: vec![SectionMarker::new(
                SectionName::Transactions,
                RBCDI_TRANSACTIONS_HEADER,
            )],
            footer: Some(String::from(RBCDI_ACTIVITY_FOOTER)),
        }
    }
}

/// Disjoint slices of one export, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections<'a> {
    preamble: &'a str,
    blocks: Vec<(SectionName, &'a str)>,
}

impl<'a> Sections<'a> {
    /// Text before the first marker (report title, account line, dates).
    pub fn preamble(&self) -> &'a str {
        self.preamble
    }

    /// Block text, starting at its header line.
    pub fn block(&self, name: SectionName) -> Option<&'a str> {
        self.blocks
            .iter()
            .find(|(block_name, _)| *block_name == name)
            .map(|(_, text)| *text)
    }

    /// Value of the first `Account: ` line in the preamble.
    pub fn account_number(&self) -> Result<String, IngestError> {
        self.preamble
            .lines()
            .find_map(account_line_value)
            .ok_or_else(|| IngestError::malformed("account", "Account number not found"))
    }
}

fn account_line_value(line: &str) -> Option<String> {
    const LABEL: &str = "account: ";
    let start = line.to_ascii_lowercase().find(LABEL)? + LABEL.len();
    let value = line.get(start..)?.trim().trim_end_matches(',').trim_matches('"').trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// Splits `text` into the blocks named by `layout`.
///
/// Markers are searched in table order, each search starting after the
/// previous marker, and every block runs up to the next marker (the last one
/// up to the footer). A missing marker fails with the marker's section name.
pub fn split_sections<'a>(text: &'a str, layout: &ExportLayout) -> Result<Sections<'a>, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let body = match layout.footer.as_deref().and_then(|footer| text.find(footer)) {
        Some(footer_start) => &text[..footer_start],
        None => text,
    };

    let mut starts = Vec::with_capacity(layout.markers.len());
    let mut cursor = 0;
    for marker in &layout.markers {
        let offset = body[cursor..].find(&marker.marker).ok_or_else(|| {
            IngestError::malformed(
                marker.name.as_str(),
                format!("header '{}' not found", marker.marker),
            )
        })?;
        let start = cursor + offset;
        starts.push(start);
        cursor = start + marker.marker.len();
    }

    let preamble_end = starts.first().copied().unwrap_or(body.len());
    let blocks = layout
        .markers
        .iter()
        .zip(&starts)
        .enumerate()
        .map(|(index, (marker, &start))| {
            let end = starts.get(index + 1).copied().unwrap_or(body.len());
            (marker.name, &body[start..end])
        })
        .collect();

    Ok(Sections {
        preamble: &body[..preamble_end],
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ExportLayout {
        ExportLayout {
            markers: vec![
                SectionMarker::new(SectionName::AccountStats, "STATS"),
                SectionMarker::new(SectionName::Cash, "CASH"),
                SectionMarker::new(SectionName::Holdings, "HOLD"),
            ],
            footer: Some(String::from("FOOTER")),
        }
    }

    #[test]
    fn slices_blocks_between_markers_and_drops_footer() {
        let text = "Account: 42\nSTATS\n1\nCASH\n2\nHOLD\n3\nFOOTER\nlegal";
        let sections = split_sections(text, &layout()).expect("must split");

        assert_eq!(sections.preamble(), "Account: 42\n");
        assert_eq!(sections.block(SectionName::AccountStats), Some("STATS\n1\n"));
        assert_eq!(sections.block(SectionName::Cash), Some("CASH\n2\n"));
        assert_eq!(sections.block(SectionName::Holdings), Some("HOLD\n3\n"));
        assert_eq!(sections.block(SectionName::Transactions), None);
        assert_eq!(sections.account_number().expect("present"), "42");
    }

    #[test]
    fn missing_footer_keeps_tail() {
        let text = "STATS\n1\nCASH\n2\nHOLD\n3\n";
        let sections = split_sections(text, &layout()).expect("must split");
        assert_eq!(sections.block(SectionName::Holdings), Some("HOLD\n3\n"));
    }

    #[test]
    fn missing_table_marker_names_the_section() {
        let text = "Account: 42\nSTATS\n1\nHOLD\n3\n";
        let error = split_sections(text, &layout()).expect_err("must fail");

        match error {
            IngestError::MalformedSection { section, message } => {
                assert_eq!(section, "cash");
                assert!(message.contains("CASH"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn markers_must_appear_in_layout_order() {
        let text = "HOLD\n3\nSTATS\n1\nCASH\n2\n";
        let error = split_sections(text, &layout()).expect_err("must fail");
        assert!(matches!(error, IngestError::MalformedSection { ref section, .. } if section == "holdings"));
    }

    #[test]
    fn missing_account_line_is_reported() {
        let sections = split_sections("Title\nSTATS\nCASH\nHOLD\n", &layout()).expect("must split");
        let error = sections.account_number().expect_err("must fail");
        assert!(error.to_string().contains("Account number not found"));
    }

    #[test]
    fn account_line_tolerates_quotes_and_trailing_delimiters() {
        let text = "\u{feff}\"Account: 12345678 - RRSP\",,,\r\nSTATS\nCASH\nHOLD\n";
        let sections = split_sections(text, &layout()).expect("must split");
        assert_eq!(sections.account_number().expect("present"), "12345678 - RRSP");
    }
}

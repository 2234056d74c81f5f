use serde_json::Value;
use tracing::warn;

use super::SectionName;
use crate::{IngestError, RawRecord};

/// Label reinserted in front of the holdings header, whose first column is
/// unnamed in the export.
pub const HOLDINGS_SYNTHETIC_HEADER: &str = "Holding Type";

/// Parses one section block into ordered column-name → text mappings.
///
/// The block is trimmed and its first line is the header. When
/// `synthetic_header_prefix` is given it is prepended to the block before
/// parsing. Rows whose cells are all blank are skipped; an empty block yields
/// no rows.
pub fn project_rows(
    section: SectionName,
    text: &str,
    synthetic_header_prefix: Option<&str>,
) -> Result<Vec<RawRecord>, IngestError> {
    let text = match synthetic_header_prefix {
        Some(prefix) => format!("{prefix}{text}"),
        None => text.to_owned(),
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| IngestError::malformed(section.as_str(), format!("unreadable header: {error}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|error| IngestError::malformed(section.as_str(), format!("unreadable row: {error}")))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row = headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let cell = record.get(index).unwrap_or_default();
                (header.to_owned(), Value::String(cell.to_owned()))
            })
            .collect::<RawRecord>();
        rows.push(row);
    }

    Ok(rows)
}

/// Parses a block expected to hold exactly one data row and drops the
/// unnamed column produced by the table's leading delimiter.
pub fn project_single_row(section: SectionName, text: &str) -> Result<RawRecord, IngestError> {
    let mut rows = project_rows(section, text, None)?;
    if rows.len() > 1 {
        warn!(section = %section, rows = rows.len(), "expected one row, keeping the last");
    }

    let mut row = rows
        .pop()
        .ok_or_else(|| IngestError::malformed(section.as_str(), "expected one data row, found none"))?;
    row.shift_remove("");
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rows_by_header_preserving_column_order() {
        let rows = project_rows(
            SectionName::Cash,
            "\nCurrency,Cash,Investments,Total\nCAD,10.00,50.00,60.00\nUSD,0.00,0.00,0.00\n\n",
            None,
        )
        .expect("must parse");

        assert_eq!(rows.len(), 2);
        let keys: Vec<_> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Currency", "Cash", "Investments", "Total"]);
        assert_eq!(rows[1]["Currency"], "USD");
    }

    #[test]
    fn synthetic_prefix_names_the_leading_column() {
        let rows = project_rows(
            SectionName::Holdings,
            ",Product,Symbol\nEquities,Common Shares,ABC\n",
            Some(HOLDINGS_SYNTHETIC_HEADER),
        )
        .expect("must parse");

        assert_eq!(rows[0]["Holding Type"], "Equities");
        assert_eq!(rows[0]["Symbol"], "ABC");
    }

    #[test]
    fn quoted_cells_keep_embedded_delimiters() {
        let rows = project_rows(
            SectionName::Holdings,
            "Name,Total\n\"Big Co, Inc.\",\"1,234.50\"\n",
            None,
        )
        .expect("must parse");

        assert_eq!(rows[0]["Name"], "Big Co, Inc.");
        assert_eq!(rows[0]["Total"], "1,234.50");
    }

    #[test]
    fn short_rows_fill_missing_cells_with_empty_text() {
        let rows = project_rows(SectionName::Cash, "A,B,C\n1\n", None).expect("must parse");
        assert_eq!(rows[0]["C"], "");
    }

    #[test]
    fn blank_block_yields_no_rows() {
        assert!(project_rows(SectionName::Cash, "  \n ", None).expect("must parse").is_empty());
    }

    #[test]
    fn single_row_drops_unnamed_column() {
        let row = project_single_row(
            SectionName::AccountStats,
            ",Trailing 12 Mo Return,Combined Total in CAD\n,5.2%,\"12,000.00\"\n",
        )
        .expect("must parse");

        assert!(row.get("").is_none());
        assert_eq!(row["Trailing 12 Mo Return"], "5.2%");
        assert_eq!(row["Combined Total in CAD"], "12,000.00");
    }

    #[test]
    fn single_row_requires_a_data_row() {
        let error = project_single_row(SectionName::AccountStats, ",Trailing 12 Mo Return\n")
            .expect_err("must fail");
        assert!(matches!(error, IngestError::MalformedSection { ref section, .. } if section == "account stats"));
    }
}

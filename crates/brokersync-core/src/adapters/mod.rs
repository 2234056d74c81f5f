//! Per-institution canonical mappers.
//!
//! Each adapter is a pure mapping from one raw institution row to the
//! canonical [`Position`] or [`Transaction`] shape. Adapters never perform
//! I/O; the Questrade API client lives next to its adapter but is a separate
//! type.

mod questrade;
mod rbcdi;

pub use questrade::{QuestradeAdapter, QuestradeClient};
pub use rbcdi::{parse_activity_export, parse_holdings_export, RbcdiAdapter};

use serde_json::Value;
use tracing::debug;

use crate::{IngestError, Institution, Position, RawRecord, Transaction};

/// Canonical mapping contract shared by every institution.
pub trait SourceAdapter: Send + Sync {
    fn institution(&self) -> Institution;

    fn to_position(&self, row: &RawRecord) -> Result<Position, IngestError>;

    /// Returns `Ok(None)` for rows that are not buy or sell trades.
    fn to_transaction(&self, row: &RawRecord) -> Result<Option<Transaction>, IngestError>;

    fn normalize_positions(&self, rows: &[RawRecord]) -> Result<Vec<Position>, IngestError> {
        rows.iter().map(|row| self.to_position(row)).collect()
    }

    /// Maps every row and keeps only trades, in source order.
    fn normalize_transactions(&self, rows: &[RawRecord]) -> Result<Vec<Transaction>, IngestError> {
        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            match self.to_transaction(row)? {
                Some(transaction) => transactions.push(transaction),
                None => debug!(institution = %self.institution(), "skipping non-trade activity"),
            }
        }
        Ok(transactions)
    }
}

static QUESTRADE: QuestradeAdapter = QuestradeAdapter;
static RBCDI: RbcdiAdapter = RbcdiAdapter;

/// Selects the mapper for `institution`.
pub fn adapter_for(institution: Institution) -> &'static dyn SourceAdapter {
    match institution {
        Institution::Questrade => &QUESTRADE,
        Institution::Rbcdi => &RBCDI,
    }
}

/// Converts JSON values known to hold objects into rows, rejecting anything
/// else.
pub(crate) fn as_rows(section: &str, values: &[Value]) -> Result<Vec<RawRecord>, IngestError> {
    values
        .iter()
        .map(|value| {
            value
                .as_object()
                .cloned()
                .ok_or_else(|| IngestError::parse(section, "expected a JSON object"))
        })
        .collect()
}

/// Text value of `field`; missing, null and non-text values are parse errors.
pub(crate) fn text_field<'a>(row: &'a RawRecord, field: &str) -> Result<&'a str, IngestError> {
    match row.get(field) {
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(Value::Null) | None => Err(IngestError::parse(field, "field is missing")),
        Some(other) => Err(IngestError::parse(field, format!("expected text, found {other}"))),
    }
}

/// Like [`text_field`] but absent and null fields read as empty text.
pub(crate) fn optional_text_field<'a>(row: &'a RawRecord, field: &str) -> &'a str {
    row.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Numeric value of `field`, accepting JSON numbers or formatted text.
pub(crate) fn number_field(row: &RawRecord, field: &str) -> Result<f64, IngestError> {
    match row.get(field) {
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| IngestError::parse(field, format!("'{number}' is not representable"))),
        Some(Value::String(text)) => parse_decimal(text)
            .ok_or_else(|| IngestError::parse(field, format!("'{text}' is not a number"))),
        Some(Value::Null) | None => Err(IngestError::parse(field, "field is missing")),
        Some(other) => Err(IngestError::parse(field, format!("expected a number, found {other}"))),
    }
}

/// Parses export-formatted decimals such as `1,234.50`, `$(12.00)`, `-5`,
/// `12.00-` or `1.234,56`.
pub fn parse_decimal(input: &str) -> Option<f64> {
    let mut text: String = input
        .chars()
        .filter(|ch| !matches!(ch, '$' | '+' | ' ' | '\u{a0}'))
        .collect();

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = text[1..text.len() - 1].to_owned();
    }
    if let Some(rest) = text.strip_suffix('-') {
        negative = true;
        text = rest.to_owned();
    }
    if let Some(rest) = text.strip_prefix('-') {
        negative = !negative;
        text = rest.to_owned();
    }

    let normalized = match (text.rfind(','), text.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => text.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => text.replace(',', ""),
        (Some(comma), None)
            if text.matches(',').count() == 1
                && (text.len() - comma - 1 != 3 || matches!(&text[..comma], "" | "0")) =>
        {
            text.replace(',', ".")
        }
        (Some(_), None) => text.replace(',', ""),
        (None, _) => text,
    };

    if normalized.is_empty() || !normalized.chars().all(|ch| ch.is_ascii_digit() || ch == '.') {
        return None;
    }

    let value = normalized.parse::<f64>().ok()?;
    Some(if negative { -value } else { value })
}

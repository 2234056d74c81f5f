use serde_json::{Map, Value};
use tracing::info;

use super::{number_field, optional_text_field, text_field, SourceAdapter};
use crate::csv_export::{
    project_rows, project_single_row, split_sections, ExportLayout, SectionName,
    HOLDINGS_SYNTHETIC_HEADER,
};
use crate::{
    Account, AccountRecord, IngestError, Institution, Position, RawRecord, Symbol, TradeAction,
    Transaction, UtcDateTime,
};

/// Canonical mapper for RBC Direct Investing export rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RbcdiAdapter;

impl SourceAdapter for RbcdiAdapter {
    fn institution(&self) -> Institution {
        Institution::Rbcdi
    }

    fn to_position(&self, row: &RawRecord) -> Result<Position, IngestError> {
        let symbol = exchange_symbol(row)?;
        Ok(Position::new(
            symbol,
            number_field(row, "Quantity")?,
            number_field(row, "Total Market Value")?,
            number_field(row, "Total Book Cost")?,
            number_field(row, "Last Price")?,
        )?)
    }

    fn to_transaction(&self, row: &RawRecord) -> Result<Option<Transaction>, IngestError> {
        let Some(action) = TradeAction::from_action(optional_text_field(row, "Activity")) else {
            return Ok(None);
        };

        let date = UtcDateTime::parse_text_date(text_field(row, "Date")?)?;
        Ok(Some(Transaction::new(
            Institution::Rbcdi,
            date,
            action,
            optional_text_field(row, "Description"),
            number_field(row, "Quantity")?,
            exchange_symbol(row)?,
            number_field(row, "Value")?,
            text_field(row, "Currency")?,
            number_field(row, "Price")?,
        )?))
    }
}

/// `<ticker>.<suffix>` with the suffix chosen by the row's currency.
fn exchange_symbol(row: &RawRecord) -> Result<Symbol, IngestError> {
    let ticker = text_field(row, "Symbol")?;
    let currency = text_field(row, "Currency")?;
    Symbol::with_exchange_for_currency(ticker, currency).map_err(|error| IngestError::parse("Symbol", error.to_string()))
}

/// Parses a holdings export into one holdings-derived account record.
///
/// Account statistics become account details, the cash table becomes
/// `balances` and the holdings table becomes raw and normalized positions.
pub fn parse_holdings_export(text: &str) -> Result<AccountRecord, IngestError> {
    let sections = split_sections(text, &ExportLayout::rbcdi_holdings())?;
    let number = sections.account_number()?;

    let stats = project_single_row(
        SectionName::AccountStats,
        sections.block(SectionName::AccountStats).unwrap_or_default(),
    )?;
    let cash = project_rows(
        SectionName::Cash,
        sections.block(SectionName::Cash).unwrap_or_default(),
        None,
    )?;
    let holdings = project_rows(
        SectionName::Holdings,
        sections.block(SectionName::Holdings).unwrap_or_default(),
        Some(HOLDINGS_SYNTHETIC_HEADER),
    )?;

    let normalized = RbcdiAdapter.normalize_positions(&holdings)?;
    let account = Account::new(Institution::Rbcdi, number, stats)?;
    info!(account = %account.number, positions = normalized.len(), "parsed holdings export");

    Ok(AccountRecord::new(account)
        .with_holdings(holdings.into_iter().map(Value::Object).collect(), normalized)
        .with_balances(Value::Array(cash.into_iter().map(Value::Object).collect())))
}

/// Parses an activity export into one transaction-derived record per
/// `Account` column value, in order of first appearance.
pub fn parse_activity_export(text: &str) -> Result<Vec<AccountRecord>, IngestError> {
    let sections = split_sections(text, &ExportLayout::rbcdi_activity())?;
    let rows = project_rows(
        SectionName::Transactions,
        sections.block(SectionName::Transactions).unwrap_or_default(),
        None,
    )?;

    let mut groups: Vec<(String, Vec<RawRecord>)> = Vec::new();
    for row in rows {
        let number = text_field(&row, "Account")?.trim().to_owned();
        match groups.iter_mut().find(|(existing, _)| *existing == number) {
            Some((_, group)) => group.push(row),
            None => groups.push((number, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(number, rows)| {
            let normalized = RbcdiAdapter.normalize_transactions(&rows)?;
            let account = Account::new(Institution::Rbcdi, number, Map::new())?;
            info!(
                account = %account.number,
                activities = rows.len(),
                trades = normalized.len(),
                "parsed activity export"
            );
            Ok(AccountRecord::new(account)
                .with_activities(rows.into_iter().map(Value::Object).collect(), normalized))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_export::{
        RBCDI_ACCOUNT_STATS_HEADER, RBCDI_CASH_HEADER, RBCDI_HOLDINGS_HEADER,
        RBCDI_TRANSACTIONS_HEADER,
    };
    use serde_json::json;

    fn row(value: Value) -> RawRecord {
        value.as_object().cloned().expect("object")
    }

    fn holdings_export() -> String {
        format!(
            "Holdings\n\"Account: 12345678\"\nAs of May 1 2024\n\n{RBCDI_ACCOUNT_STATS_HEADER}\n,4.50%,10.00,25.00%,40.00,0.00,60.00,44.00\n\n{RBCDI_CASH_HEADER}\nCAD,10.00,50.00,60.00\nUSD,0.00,0.00,0.00\n\n{RBCDI_HOLDINGS_HEADER}\nEquities,Common Shares,ABC,ABC Corp,10,5.00,CAD,0.10,2.00%,40.00,50.00,10.00,25.00%,4.00,,,,Yes,No,Yes,,,,\n\nImportant Information\nPrices are delayed.\n"
        )
    }

    #[test]
    fn maps_holding_rows_with_exchange_suffix() {
        let position = RbcdiAdapter
            .to_position(&row(json!({
                "Symbol": "ABC",
                "Currency": "CAD",
                "Quantity": "10",
                "Last Price": "5.00",
                "Total Market Value": "50.00",
                "Total Book Cost": "40.00"
            })))
            .expect("valid position");

        assert_eq!(position.symbol.as_str(), "ABC.TO");
        assert_eq!(position.average_price, 4.0);
        assert_eq!(position.pl, 10.0);
    }

    #[test]
    fn unknown_currency_is_a_parse_error() {
        let error = RbcdiAdapter
            .to_position(&row(json!({
                "Symbol": "ABC",
                "Currency": "EUR",
                "Quantity": "1",
                "Last Price": "1",
                "Total Market Value": "1",
                "Total Book Cost": "1"
            })))
            .expect_err("must fail");

        assert!(matches!(error, IngestError::Parse { .. }));
    }

    #[test]
    fn holdings_export_yields_stats_cash_and_positions() {
        let record = parse_holdings_export(&holdings_export()).expect("valid export");

        assert_eq!(record.account.number, "12345678");
        assert_eq!(record.account.institution, Institution::Rbcdi);
        assert_eq!(record.account.details["Trailing 12 Mo Return"], "4.50%");
        assert!(record.account.details.get("").is_none());

        let balances = record.balances.expect("cash table");
        assert_eq!(balances[0]["Currency"], "CAD");
        assert_eq!(balances.as_array().map(Vec::len), Some(2));

        let positions = record.positions.expect("raw holdings");
        assert_eq!(positions[0]["Holding Type"], "Equities");

        let normalized = record.normalized_positions.expect("normalized holdings");
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].symbol.as_str(), "ABC.TO");
        assert_eq!(normalized[0].market_value, 50.0);
    }

    #[test]
    fn holdings_export_without_account_line_fails() {
        let text = holdings_export().replace("\"Account: 12345678\"", "Account number hidden");
        let error = parse_holdings_export(&text).expect_err("must fail");
        assert!(error.to_string().contains("Account number not found"));
    }

    #[test]
    fn activity_export_groups_by_account_and_filters_trades() {
        let text = format!(
            "Activity Export\n\n{RBCDI_TRANSACTIONS_HEADER}\n\"Jan 1 2023\",Buy,ABC,-5,-20,\"Jan 4 2023\",111,-100,CAD,\" ABC CORP \"\n\"Jan 2 2023\",Dividend,ABC,,,\"Jan 2 2023\",111,3.20,CAD,DIV\n\"Jan 3 2023\",Sell,XYZ,2,15.5,\"Jan 5 2023\",222,31,USD,XYZ INC\n\nDisclaimer\nNot advice.\n"
        );

        let records = parse_activity_export(&text).expect("valid export");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].account.number, "111");
        assert_eq!(records[1].account.number, "222");

        assert_eq!(records[0].activities.as_ref().map(Vec::len), Some(2));
        let trades = records[0].normalized_transactions.as_ref().expect("trades");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].action, TradeAction::Buy);
        assert_eq!(trades[0].units, 5.0);
        assert_eq!(trades[0].fiat_amount, 100.0);
        assert_eq!(trades[0].price_per_unit, 20.0);
        assert_eq!(trades[0].description, "ABC CORP");
        assert_eq!(trades[0].symbol.as_str(), "ABC.TO");
        assert_eq!(trades[0].date.format_iso(), "2023-01-01T00:00:00.000Z");

        let usd = records[1].normalized_transactions.as_ref().expect("trades");
        assert_eq!(usd[0].symbol.as_str(), "XYZ.US");
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Institution, Symbol, UtcDateTime, ValidationError};

/// One raw institution row: a CSV mapping of column name to text, or an API
/// JSON object. Key order follows the source.
pub type RawRecord = Map<String, Value>;

const RESERVED_ACCOUNT_KEYS: [&str; 3] = ["institution", "uuid", "number"];

/// Brokerage account identity plus whatever summary figures the institution
/// reported, carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub institution: Institution,
    pub uuid: Uuid,
    pub number: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Account {
    /// Builds an account with a fresh run-scoped uuid. Detail keys that would
    /// shadow the identity fields are dropped.
    pub fn new(
        institution: Institution,
        number: impl Into<String>,
        mut details: Map<String, Value>,
    ) -> Result<Self, ValidationError> {
        let number = number.into().trim().to_owned();
        if number.is_empty() {
            return Err(ValidationError::EmptyAccountNumber);
        }

        for key in RESERVED_ACCOUNT_KEYS {
            details.shift_remove(key);
        }

        Ok(Self {
            institution,
            uuid: Uuid::new_v4(),
            number,
            details,
        })
    }
}

/// Canonical holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: Symbol,
    pub quantity: f64,
    pub market_value: f64,
    pub book_value: f64,
    pub price: f64,
    pub average_price: f64,
    /// Signed: `market_value - book_value`.
    pub pl: f64,
}

impl Position {
    /// Takes source figures in whatever sign convention the institution uses,
    /// keeps their magnitudes and derives `average_price` and `pl`.
    pub fn new(
        symbol: Symbol,
        quantity: f64,
        market_value: f64,
        book_value: f64,
        price: f64,
    ) -> Result<Self, ValidationError> {
        let quantity = magnitude("quantity", quantity)?;
        let market_value = magnitude("marketValue", market_value)?;
        let book_value = magnitude("bookValue", book_value)?;
        let price = magnitude("price", price)?;

        let average_price = if quantity == 0.0 {
            0.0
        } else {
            book_value / quantity
        };

        Ok(Self {
            symbol,
            quantity,
            market_value,
            book_value,
            price,
            average_price,
            pl: market_value - book_value,
        })
    }
}

/// Trade direction; every other activity kind is filtered out upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    /// Returns `None` for dividends, transfers, fees and anything else that is
    /// not a buy or a sell.
    pub fn from_action(action: &str) -> Option<Self> {
        match action.trim().to_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

/// Canonical trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub source: Institution,
    pub date: UtcDateTime,
    #[serde(rename = "type")]
    pub action: TradeAction,
    pub description: String,
    pub units: f64,
    pub symbol: Symbol,
    pub fiat_amount: f64,
    pub fiat_currency: String,
    pub price_per_unit: f64,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Institution,
        date: UtcDateTime,
        action: TradeAction,
        description: &str,
        units: f64,
        symbol: Symbol,
        fiat_amount: f64,
        fiat_currency: &str,
        price_per_unit: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            source,
            date,
            action,
            description: description.trim().to_owned(),
            units: magnitude("units", units)?,
            symbol,
            fiat_amount: magnitude("fiatAmount", fiat_amount)?,
            fiat_currency: validate_currency_code(fiat_currency)?,
            price_per_unit: magnitude("pricePerUnit", price_per_unit)?,
        })
    }
}

/// Output unit: one per institution per account number.
///
/// Holdings-derived records fill `positions`, `normalized_positions` and
/// `balances`; activity-derived records fill `activities` and
/// `normalized_transactions`. Absent sides are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub account: Account,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_positions: Option<Vec<Position>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_transactions: Option<Vec<Transaction>>,
}

impl AccountRecord {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            positions: None,
            normalized_positions: None,
            balances: None,
            activities: None,
            normalized_transactions: None,
        }
    }

    pub fn with_holdings(mut self, raw: Vec<Value>, normalized: Vec<Position>) -> Self {
        self.positions = Some(raw);
        self.normalized_positions = Some(normalized);
        self
    }

    pub fn with_balances(mut self, balances: Value) -> Self {
        self.balances = Some(balances);
        self
    }

    pub fn with_activities(mut self, raw: Vec<Value>, normalized: Vec<Transaction>) -> Self {
        self.activities = Some(raw);
        self.normalized_transactions = Some(normalized);
        self
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn magnitude(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(value.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_derives_average_price_and_pl() {
        let symbol = Symbol::parse("ABC.TO").expect("symbol");
        let position = Position::new(symbol, 10.0, 50.0, 40.0, 5.0).expect("valid");

        assert_eq!(position.average_price, 4.0);
        assert_eq!(position.pl, 10.0);
    }

    #[test]
    fn position_discards_source_signs() {
        let symbol = Symbol::parse("XYZ").expect("symbol");
        let position = Position::new(symbol, -4.0, -80.0, -100.0, -20.0).expect("valid");

        assert_eq!(position.quantity, 4.0);
        assert_eq!(position.market_value, 80.0);
        assert_eq!(position.book_value, 100.0);
        assert_eq!(position.price, 20.0);
        assert_eq!(position.average_price, 25.0);
        assert_eq!(position.pl, -20.0);
    }

    #[test]
    fn zero_quantity_has_zero_average_price() {
        let symbol = Symbol::parse("XYZ").expect("symbol");
        let position = Position::new(symbol, 0.0, 0.0, 12.0, 3.0).expect("valid");
        assert_eq!(position.average_price, 0.0);
    }

    #[test]
    fn rejects_non_finite_figures() {
        let symbol = Symbol::parse("XYZ").expect("symbol");
        let err = Position::new(symbol, f64::NAN, 1.0, 1.0, 1.0).expect_err("must fail");
        assert_eq!(err, ValidationError::NonFiniteValue { field: "quantity" });
    }

    #[test]
    fn trade_action_ignores_non_trades() {
        assert_eq!(TradeAction::from_action(" BUY "), Some(TradeAction::Buy));
        assert_eq!(TradeAction::from_action("Sell"), Some(TradeAction::Sell));
        assert_eq!(TradeAction::from_action("Dividend"), None);
        assert_eq!(TradeAction::from_action("Transfer"), None);
    }

    #[test]
    fn account_drops_shadowing_detail_keys() {
        let mut details = Map::new();
        details.insert(String::from("number"), Value::from("999"));
        details.insert(String::from("type"), Value::from("TFSA"));

        let account = Account::new(Institution::Questrade, " 123 ", details).expect("valid");
        let json = serde_json::to_value(&account).expect("serializable");

        assert_eq!(json["number"], "123");
        assert_eq!(json["type"], "TFSA");
        assert_eq!(json["institution"], "questrade");
    }

    #[test]
    fn account_keeps_detail_order_when_dropping_identity_keys() {
        let details = serde_json::json!({
            "type": "TFSA",
            "number": "111",
            "status": "Active",
            "isPrimary": true,
            "isBilling": true,
            "clientAccountType": "Individual"
        });
        let details = details.as_object().cloned().expect("object");

        let account = Account::new(Institution::Questrade, "111", details).expect("valid");
        let keys: Vec<&str> = account.details.keys().map(String::as_str).collect();

        assert_eq!(keys, ["type", "status", "isPrimary", "isBilling", "clientAccountType"]);
    }

    #[test]
    fn record_omits_absent_sides() {
        let account = Account::new(Institution::Rbcdi, "1", Map::new()).expect("valid");
        let json = serde_json::to_value(AccountRecord::new(account)).expect("serializable");

        assert!(json.get("positions").is_none());
        assert!(json.get("normalizedTransactions").is_none());
    }
}

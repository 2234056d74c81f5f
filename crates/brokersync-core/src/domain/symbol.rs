use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Exchange suffix for CAD-denominated CSV holdings.
pub const CAD_EXCHANGE_SUFFIX: &str = "TO";
/// Placeholder suffix for USD-denominated CSV holdings; the export does not
/// say which US exchange lists the security.
pub const USD_EXCHANGE_SUFFIX: &str = "US";

/// Security symbol as reported by the institution, optionally qualified with an
/// exchange suffix (`ABC.TO`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trims the input and rejects empty or whitespace-bearing symbols. Case is
    /// preserved because option symbols are case-significant.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::SymbolWhitespace {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Composes `<ticker>.<suffix>` where the suffix is derived from the
    /// holding's currency.
    pub fn with_exchange_for_currency(ticker: &str, currency: &str) -> Result<Self, ValidationError> {
        let ticker = Self::parse(ticker)?;
        let suffix = exchange_suffix(currency)?;
        Ok(Self(format!("{}.{suffix}", ticker.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn exchange_suffix(currency: &str) -> Result<&'static str, ValidationError> {
    match currency.trim().to_ascii_uppercase().as_str() {
        "CAD" => Ok(CAD_EXCHANGE_SUFFIX),
        "USD" => Ok(USD_EXCHANGE_SUFFIX),
        _ => Err(ValidationError::UnsupportedCurrency {
            value: currency.to_owned(),
        }),
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

//! # Domain Models
//!
//! Canonical, institution-agnostic types every source is mapped into.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Account`] | Account identity plus opaque institution statistics |
//! | [`Position`] | Holding with magnitudes, average price and P/L |
//! | [`Transaction`] | Buy or sell trade |
//! | [`AccountRecord`] | Output unit joining an account with its holdings and trades |
//! | [`Symbol`] | Security symbol, optionally exchange-qualified |
//! | [`UtcDateTime`] | UTC instant with millisecond ISO-8601 rendering |
//!
//! Constructors enforce the canonical invariants: magnitudes are absolute
//! values, numbers are finite, currency codes are 3-letter ISO codes.

mod models;
mod symbol;
mod timestamp;

pub use models::{
    validate_currency_code, Account, AccountRecord, Position, RawRecord, TradeAction, Transaction,
};
pub use symbol::{Symbol, CAD_EXCHANGE_SUFFIX, USD_EXCHANGE_SUFFIX};
pub use timestamp::UtcDateTime;

//! # Brokersync Core
//!
//! Normalization and reconciliation of brokerage account data.
//!
//! ## Overview
//!
//! Two kinds of sources are mapped into one canonical schema of accounts,
//! positions and trades:
//!
//! - **Questrade** through its REST API (refresh-token login, per-account
//!   positions, balances and a windowed activity history)
//! - **RBC Direct Investing** through its composite CSV holdings and activity
//!   exports
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Per-institution canonical mappers and the Questrade API client |
//! | [`config`] | Explicit pipeline configuration |
//! | [`csv_export`] | Marker-driven section splitting and row projection |
//! | [`discovery`] | Export file discovery by name pattern |
//! | [`domain`] | Canonical account, position and transaction types |
//! | [`error`] | Validation and ingestion error taxonomy |
//! | [`history`] | Time-windowed activity history fetch |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`institution`] | Institution identifiers |
//! | [`pipeline`] | Pipeline entry points and failure policy |
//! | [`reconcile`] | Cross-source merge by account number |
//! | [`throttling`] | Per-host request quota |
//! | [`token`] | Refresh-token exchange and persistence |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brokersync_core::{run_rbcdi, PipelineConfig};
//!
//! let config = PipelineConfig {
//!     input_dir: "exports".into(),
//!     ..PipelineConfig::default()
//! };
//! let records = run_rbcdi(&config)?;
//! println!("{}", serde_json::to_string_pretty(&records)?);
//! ```

pub mod adapters;
pub mod config;
pub mod csv_export;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod history;
pub mod http_client;
pub mod institution;
pub mod pipeline;
pub mod reconcile;
pub mod throttling;
pub mod token;

pub use adapters::{
    adapter_for, parse_activity_export, parse_holdings_export, parse_decimal, QuestradeAdapter,
    QuestradeClient, RbcdiAdapter, SourceAdapter,
};
pub use config::{FailurePolicy, PipelineConfig};
pub use discovery::{discover_files, FilePattern};
pub use domain::{
    validate_currency_code, Account, AccountRecord, Position, RawRecord, Symbol, TradeAction,
    Transaction, UtcDateTime,
};
pub use error::{IngestError, ValidationError};
pub use history::{HistoryWindower, Window};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    RecordingHttpClient, ReqwestHttpClient,
};
pub use institution::Institution;
pub use pipeline::{collect_outcomes, run_questrade, run_rbcdi, with_deadline, AccountOutcome};
pub use reconcile::{deep_merge, merge_records, reconcile};
pub use throttling::RequestThrottle;
pub use token::{AccessGrant, QuestradeLogin, TokenProvider, TokenStore};

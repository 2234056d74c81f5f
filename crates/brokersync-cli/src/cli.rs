//! CLI argument definitions for brokersync.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `questrade` | Fetch accounts, positions, balances and activity from the Questrade API |
//! | `rbcdi` | Parse RBC Direct Investing holdings and activity CSV exports |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--compact` | `false` | Single-line JSON instead of indented |
//! | `--lookback-windows` | `48` | Activity windows to request |
//! | `--window-days` | `30` | Length of one activity window |
//! | `--delay-ms` | `50` | Pause after each activity window |
//! | `--timeout-ms` | `10000` | Per-request timeout |
//! | `--deadline-secs` | none | Overall run deadline |
//! | `--requests-per-second` | none | Request quota per API host |
//! | `--skip-failed` | `false` | Emit healthy accounts when others fail |
//!
//! # Examples
//!
//! ```bash
//! brokersync questrade --refresh-token <token>
//! brokersync rbcdi --input-dir ./holdings --compact
//! ```

use std::num::NonZeroU32;
use std::path::PathBuf;

use brokersync_core::config::{
    DEFAULT_LOGIN_HOST, DEFAULT_LOOKBACK_WINDOWS, DEFAULT_REQUEST_DELAY_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_WINDOW_DAYS,
};
use brokersync_core::FilePattern;
use clap::{Args, Parser, Subcommand};

/// Normalize brokerage accounts, positions and trades into one JSON schema.
#[derive(Debug, Parser)]
#[command(name = "brokersync", author, version, about)]
pub struct Cli {
    /// Print single-line JSON instead of indented JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub compact: bool,

    /// Number of activity windows to request, newest first.
    #[arg(long, global = true, default_value_t = DEFAULT_LOOKBACK_WINDOWS)]
    pub lookback_windows: u32,

    /// Length of one activity window in days.
    #[arg(long, global = true, default_value_t = DEFAULT_WINDOW_DAYS)]
    pub window_days: u32,

    /// Pause after each activity window response, in milliseconds.
    #[arg(long, global = true, default_value_t = DEFAULT_REQUEST_DELAY_MS)]
    pub delay_ms: u64,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Abort the whole run after this many seconds.
    #[arg(long, global = true)]
    pub deadline_secs: Option<u64>,

    /// Maximum requests per second against one API host.
    #[arg(long, global = true)]
    pub requests_per_second: Option<NonZeroU32>,

    /// Emit the accounts that succeeded when others fail, instead of failing
    /// the run.
    #[arg(long, global = true, default_value_t = false)]
    pub skip_failed: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every account from the Questrade API.
    ///
    /// The refresh token is exchanged for an access token and the new token
    /// payload is written back to the token file.
    Questrade(QuestradeArgs),

    /// Parse RBC Direct Investing CSV exports from a directory.
    Rbcdi(RbcdiArgs),
}

#[derive(Debug, Args)]
pub struct QuestradeArgs {
    /// Refresh token from the Questrade API dashboard. Falls back to the
    /// token file when absent.
    #[arg(long, env = "BROKERSYNC_QUESTRADE_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Token file read for the refresh token and rewritten after login.
    #[arg(long, default_value = "token")]
    pub token_file: PathBuf,

    /// OAuth login host.
    #[arg(long, default_value = DEFAULT_LOGIN_HOST)]
    pub login_host: String,
}

#[derive(Debug, Args)]
pub struct RbcdiArgs {
    /// Directory holding the exported CSV files.
    #[arg(long, default_value = "holdings")]
    pub input_dir: PathBuf,

    /// Holdings export file-name pattern (one `*` wildcard).
    #[arg(long, default_value = "Holdings*.csv")]
    pub holdings_pattern: FilePattern,

    /// Activity export file-name pattern (one `*` wildcard).
    #[arg(long, default_value = "Activity*.csv")]
    pub activity_pattern: FilePattern,
}

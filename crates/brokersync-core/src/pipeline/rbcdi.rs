use std::path::Path;

use tracing::info;

use super::{collect_outcomes, AccountOutcome};
use crate::adapters::{parse_activity_export, parse_holdings_export};
use crate::discovery::discover_files;
use crate::reconcile::reconcile;
use crate::{AccountRecord, IngestError, PipelineConfig};

/// Runs the RBC Direct Investing CSV pipeline over `config.input_dir`.
///
/// Every matching holdings and activity export is parsed independently, with
/// `config.failure_policy` deciding what a broken file does to the run, and
/// the two sides are then reconciled by account number.
pub fn run_rbcdi(config: &PipelineConfig) -> Result<Vec<AccountRecord>, IngestError> {
    let holdings_files = discover_files(&config.input_dir, &config.holdings_pattern)?;
    let activity_files = discover_files(&config.input_dir, &config.activity_pattern)?;
    info!(
        dir = %config.input_dir.display(),
        holdings = holdings_files.len(),
        activity = activity_files.len(),
        "discovered export files"
    );

    let holdings = holdings_files
        .iter()
        .map(|path| {
            AccountOutcome::from_result(
                path.display().to_string(),
                read_export(path).and_then(|text| parse_holdings_export(&text)),
            )
        })
        .collect();
    let holdings = collect_outcomes(holdings, config.failure_policy)?;

    let activity = activity_files
        .iter()
        .map(|path| {
            AccountOutcome::from_result(
                path.display().to_string(),
                read_export(path).and_then(|text| parse_activity_export(&text)),
            )
        })
        .collect();
    let transactions = collect_outcomes(activity, config.failure_policy)?
        .into_iter()
        .flatten()
        .collect();

    Ok(reconcile(holdings, transactions))
}

/// Reads an export; bytes that are not UTF-8 are replaced.
fn read_export(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path).map_err(|error| IngestError::io(path.display().to_string(), error))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

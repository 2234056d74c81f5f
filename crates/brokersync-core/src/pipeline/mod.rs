//! Pipeline entry points and per-account outcome handling.

mod questrade;
mod rbcdi;

pub use questrade::run_questrade;
pub use rbcdi::run_rbcdi;

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{AccountRecord, FailurePolicy, IngestError};

/// Result of one independent unit of work (an account, or an export file).
#[derive(Debug)]
pub enum AccountOutcome<T = AccountRecord> {
    Completed(T),
    Failed { subject: String, error: IngestError },
}

impl<T> AccountOutcome<T> {
    pub fn from_result(subject: impl Into<String>, result: Result<T, IngestError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(error) => Self::Failed {
                subject: subject.into(),
                error,
            },
        }
    }
}

/// Applies `policy` to a batch of outcomes, keeping input order.
///
/// Under [`FailurePolicy::Abort`] the first failure in input order is
/// returned and every completed value is discarded.
pub fn collect_outcomes<T>(
    outcomes: Vec<AccountOutcome<T>>,
    policy: FailurePolicy,
) -> Result<Vec<T>, IngestError> {
    let mut completed = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            AccountOutcome::Completed(value) => completed.push(value),
            AccountOutcome::Failed { subject, error } => match policy {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::SkipFailed => {
                    warn!(subject = %subject, code = error.code(), error = %error, "dropping failed account");
                }
            },
        }
    }
    Ok(completed)
}

/// Runs `work` to completion, or fails once `deadline` has elapsed.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, work: F) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, IngestError>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| IngestError::DeadlineExceeded {
                seconds: limit.as_secs(),
            })?,
        None => work.await,
    }
}

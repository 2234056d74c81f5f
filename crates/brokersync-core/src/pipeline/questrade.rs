use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::info;

use super::{collect_outcomes, with_deadline, AccountOutcome};
use crate::adapters::{as_rows, QuestradeAdapter, QuestradeClient, SourceAdapter};
use crate::history::HistoryWindower;
use crate::http_client::HttpClient;
use crate::throttling::RequestThrottle;
use crate::token::{TokenProvider, TokenStore};
use crate::{Account, AccountRecord, IngestError, Institution, PipelineConfig};

/// Runs the Questrade API pipeline.
///
/// The refresh token comes from `explicit_token` or else the token file. The
/// exchanged payload is persisted before any account call. Accounts are
/// fetched concurrently; within one account positions, balances and the
/// windowed activity history run concurrently, the history itself one window
/// at a time.
pub async fn run_questrade(
    config: &PipelineConfig,
    http_client: Arc<dyn HttpClient>,
    provider: &dyn TokenProvider,
    store: &TokenStore,
    explicit_token: Option<&str>,
) -> Result<Vec<AccountRecord>, IngestError> {
    config.validate()?;
    with_deadline(
        config.deadline,
        fetch_all_accounts(config, http_client, provider, store, explicit_token),
    )
    .await
}

async fn fetch_all_accounts(
    config: &PipelineConfig,
    http_client: Arc<dyn HttpClient>,
    provider: &dyn TokenProvider,
    store: &TokenStore,
    explicit_token: Option<&str>,
) -> Result<Vec<AccountRecord>, IngestError> {
    let refresh_token = store.resolve_refresh_token(explicit_token)?;
    let grant = provider.refresh(&refresh_token).await?;
    store.persist(&grant.raw)?;

    let mut client = QuestradeClient::new(
        http_client,
        &grant,
        config.request_timeout_ms,
        HistoryWindower::from_config(config),
    );
    if let Some(limit) = config.requests_per_second {
        client = client.with_throttle(RequestThrottle::per_second(limit));
    }

    let accounts = client.accounts().await?;
    info!(accounts = accounts.len(), "discovered questrade accounts");

    let outcomes = join_all(
        accounts
            .into_iter()
            .map(|account| fetch_account(&client, account, config.lookback_windows)),
    )
    .await;

    collect_outcomes(outcomes, config.failure_policy)
}

async fn fetch_account(client: &QuestradeClient, account: Value, lookback_windows: u32) -> AccountOutcome {
    let subject = account
        .get("number")
        .and_then(Value::as_str)
        .unwrap_or("<unnumbered>")
        .to_owned();
    let result = build_account_record(client, account, lookback_windows).await;
    if result.is_ok() {
        info!(account = %subject, "fetched questrade account");
    }
    AccountOutcome::from_result(subject, result)
}

async fn build_account_record(
    client: &QuestradeClient,
    account: Value,
    lookback_windows: u32,
) -> Result<AccountRecord, IngestError> {
    let Value::Object(details) = account else {
        return Err(IngestError::parse("accounts", "account entry is not an object"));
    };
    let number = details
        .get("number")
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError::parse("number", "account has no number"))?
        .to_owned();

    let (positions, balances, activities) = tokio::try_join!(
        client.positions(&number),
        client.balances(&number),
        client.fetch_activity(&number, lookback_windows),
    )?;

    let adapter = QuestradeAdapter;
    let normalized_positions = adapter.normalize_positions(&as_rows("positions", &positions)?)?;
    let normalized_transactions =
        adapter.normalize_transactions(&as_rows("activities", &activities)?)?;

    Ok(AccountRecord::new(Account::new(Institution::Questrade, number, details)?)
        .with_holdings(positions, normalized_positions)
        .with_balances(balances)
        .with_activities(activities, normalized_transactions))
}

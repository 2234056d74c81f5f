use std::sync::Arc;

use brokersync_core::{
    run_questrade, AccountRecord, HttpClient, PipelineConfig, QuestradeLogin, ReqwestHttpClient,
    TokenStore,
};
use tracing::info;

use crate::cli::QuestradeArgs;
use crate::error::CliError;

pub async fn run(args: &QuestradeArgs, config: PipelineConfig) -> Result<Vec<AccountRecord>, CliError> {
    let config = PipelineConfig {
        token_file: args.token_file.clone(),
        login_host: args.login_host.clone(),
        ..config
    };

    let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let login = QuestradeLogin::new(
        Arc::clone(&http_client),
        config.login_host.clone(),
        config.request_timeout_ms,
    );
    let store = TokenStore::new(config.token_file.clone());

    info!(token_file = %store.path().display(), "starting questrade run");
    let records = run_questrade(
        &config,
        http_client,
        &login,
        &store,
        args.refresh_token.as_deref(),
    )
    .await?;
    Ok(records)
}

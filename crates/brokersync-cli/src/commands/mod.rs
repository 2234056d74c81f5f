mod questrade;
mod rbcdi;

use std::time::Duration;

use brokersync_core::{AccountRecord, FailurePolicy, PipelineConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Vec<AccountRecord>, CliError> {
    let config = pipeline_config(cli);
    config.validate()?;

    match &cli.command {
        Command::Questrade(args) => questrade::run(args, config).await,
        Command::Rbcdi(args) => rbcdi::run(args, config),
    }
}

/// Shared knobs; each command fills in its own source settings.
fn pipeline_config(cli: &Cli) -> PipelineConfig {
    PipelineConfig {
        lookback_windows: cli.lookback_windows,
        window_days: cli.window_days,
        request_delay: Duration::from_millis(cli.delay_ms),
        request_timeout_ms: cli.timeout_ms,
        deadline: cli.deadline_secs.map(Duration::from_secs),
        requests_per_second: cli.requests_per_second,
        failure_policy: if cli.skip_failed {
            FailurePolicy::SkipFailed
        } else {
            FailurePolicy::Abort
        },
        ..PipelineConfig::default()
    }
}

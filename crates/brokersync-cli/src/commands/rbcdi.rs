use brokersync_core::{run_rbcdi, AccountRecord, PipelineConfig};

use crate::cli::RbcdiArgs;
use crate::error::CliError;

pub fn run(args: &RbcdiArgs, config: PipelineConfig) -> Result<Vec<AccountRecord>, CliError> {
    let config = PipelineConfig {
        input_dir: args.input_dir.clone(),
        holdings_pattern: args.holdings_pattern.clone(),
        activity_pattern: args.activity_pattern.clone(),
        ..config
    };

    Ok(run_rbcdi(&config)?)
}

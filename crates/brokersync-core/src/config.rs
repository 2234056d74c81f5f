//! Explicit run configuration.
//!
//! Every knob the pipeline needs is passed in through [`PipelineConfig`];
//! nothing is read from process-wide state inside the core.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use crate::discovery::FilePattern;
use crate::ValidationError;

pub const DEFAULT_LOOKBACK_WINDOWS: u32 = 48;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 50;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(DEFAULT_REQUEST_DELAY_MS);
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOGIN_HOST: &str = "https://login.questrade.com/";

/// What to do with the remaining accounts when one account fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failed account fails the whole run and nothing is emitted.
    #[default]
    Abort,
    /// Failed accounts are logged and left out; the others are emitted.
    SkipFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of activity windows to request, newest first.
    pub lookback_windows: u32,
    pub window_days: u32,
    /// Pause after each activity window response.
    pub request_delay: Duration,
    pub request_timeout_ms: u64,
    /// Upper bound for a whole run; `None` waits indefinitely.
    pub deadline: Option<Duration>,
    /// Requests per second allowed against one API host; `None` is unlimited.
    pub requests_per_second: Option<NonZeroU32>,
    pub failure_policy: FailurePolicy,
    pub input_dir: PathBuf,
    pub holdings_pattern: FilePattern,
    pub activity_pattern: FilePattern,
    pub token_file: PathBuf,
    pub login_host: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_windows: DEFAULT_LOOKBACK_WINDOWS,
            window_days: DEFAULT_WINDOW_DAYS,
            request_delay: DEFAULT_REQUEST_DELAY,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            deadline: None,
            requests_per_second: None,
            failure_policy: FailurePolicy::Abort,
            input_dir: PathBuf::from("holdings"),
            holdings_pattern: FilePattern::new("Holdings", ".csv"),
            activity_pattern: FilePattern::new("Activity", ".csv"),
            token_file: PathBuf::from("token"),
            login_host: String::from(DEFAULT_LOGIN_HOST),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lookback_windows == 0 {
            return Err(ValidationError::EmptyLookback);
        }
        if self.window_days == 0 {
            return Err(ValidationError::EmptyWindow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_four_years_of_thirty_day_windows() {
        let config = PipelineConfig::default();

        assert_eq!(config.lookback_windows, 48);
        assert_eq!(config.window_days, 30);
        assert_eq!(config.request_delay, Duration::from_millis(50));
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_lookback_and_window() {
        let config = PipelineConfig {
            lookback_windows: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::EmptyLookback));

        let config = PipelineConfig {
            window_days: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::EmptyWindow));
    }
}

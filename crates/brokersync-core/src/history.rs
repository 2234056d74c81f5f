//! Time-windowed activity history retrieval.
//!
//! A long lookback is partitioned into contiguous fixed-length windows that
//! step backward from the end of the current UTC day. Windows are requested
//! strictly one at a time with a pause after every response; the first
//! failure aborts the whole fetch.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::{IngestError, PipelineConfig, UtcDateTime};

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: UtcDateTime,
    pub end: UtcDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindower {
    window_days: u32,
    delay: Duration,
}

impl HistoryWindower {
    pub const fn new(window_days: u32, delay: Duration) -> Self {
        Self { window_days, delay }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.window_days, config.request_delay)
    }

    /// Windows covering `count * window_days` days back from the end of
    /// `now`'s day, newest first.
    pub fn plan(&self, now: UtcDateTime, count: u32) -> Vec<Window> {
        let mut end = now.end_of_day();
        let mut windows = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let start = end.minus_days(i64::from(self.window_days));
            windows.push(Window { start, end });
            end = start;
        }
        windows
    }

    /// Requests every planned window through `fetch_window` and concatenates
    /// each response's `activities` array in request order.
    pub async fn fetch<F, Fut>(
        &self,
        now: UtcDateTime,
        count: u32,
        mut fetch_window: F,
    ) -> Result<Vec<Value>, IngestError>
    where
        F: FnMut(Window) -> Fut,
        Fut: Future<Output = Result<Value, IngestError>>,
    {
        let mut activities = Vec::new();
        for window in self.plan(now, count) {
            debug!(start = %window.start, end = %window.end, "fetching activity window");
            let response = fetch_window(window).await?;
            activities.extend(window_activities(response)?);
            tokio::time::sleep(self.delay).await;
        }
        Ok(activities)
    }
}

fn window_activities(response: Value) -> Result<Vec<Value>, IngestError> {
    match response {
        Value::Object(mut body) => match body.remove("activities") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(IngestError::parse(
                "activities",
                "window response has no activities array",
            )),
        },
        _ => Err(IngestError::parse("activities", "window response is not an object")),
    }
}

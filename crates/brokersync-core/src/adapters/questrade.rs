use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{number_field, optional_text_field, text_field, SourceAdapter};
use crate::history::{HistoryWindower, Window};
use crate::http_client::{fetch_json, HttpAuth, HttpClient, HttpRequest};
use crate::throttling::RequestThrottle;
use crate::token::AccessGrant;
use crate::{
    IngestError, Institution, Position, RawRecord, Symbol, TradeAction, Transaction, UtcDateTime,
};

/// Activity `type` marking executed trades.
const TRADES_ACTIVITY_TYPE: &str = "Trades";

/// Canonical mapper for Questrade REST API objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestradeAdapter;

impl SourceAdapter for QuestradeAdapter {
    fn institution(&self) -> Institution {
        Institution::Questrade
    }

    fn to_position(&self, row: &RawRecord) -> Result<Position, IngestError> {
        let symbol = Symbol::parse(text_field(row, "symbol")?)?;
        Ok(Position::new(
            symbol,
            number_field(row, "openQuantity")?,
            number_field(row, "currentMarketValue")?,
            number_field(row, "totalCost")?,
            number_field(row, "currentPrice")?,
        )?)
    }

    fn to_transaction(&self, row: &RawRecord) -> Result<Option<Transaction>, IngestError> {
        if optional_text_field(row, "type") != TRADES_ACTIVITY_TYPE {
            return Ok(None);
        }
        let Some(action) = TradeAction::from_action(optional_text_field(row, "action")) else {
            return Ok(None);
        };

        let date = UtcDateTime::parse(text_field(row, "tradeDate")?)?;
        let symbol = Symbol::parse(text_field(row, "symbol")?)?;

        Ok(Some(Transaction::new(
            Institution::Questrade,
            date,
            action,
            optional_text_field(row, "description"),
            number_field(row, "quantity")?,
            symbol,
            number_field(row, "grossAmount")?,
            text_field(row, "currency")?,
            number_field(row, "price")?,
        )?))
    }
}

/// Account-scoped Questrade API calls made with one access grant.
#[derive(Clone)]
pub struct QuestradeClient {
    http_client: Arc<dyn HttpClient>,
    api_host: String,
    auth: HttpAuth,
    timeout_ms: u64,
    throttle: Option<RequestThrottle>,
    windower: HistoryWindower,
}

impl QuestradeClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        grant: &AccessGrant,
        timeout_ms: u64,
        windower: HistoryWindower,
    ) -> Self {
        Self {
            http_client,
            api_host: grant.api_host.clone(),
            auth: HttpAuth::BearerToken(grant.access_token.clone()),
            timeout_ms,
            throttle: None,
            windower,
        }
    }

    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    async fn get(&self, path: &str) -> Result<Value, IngestError> {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let request = HttpRequest::get(format!("{}{path}", self.api_host))
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        fetch_json(self.http_client.as_ref(), request).await
    }

    /// `GET v1/accounts`: the account objects.
    pub async fn accounts(&self) -> Result<Vec<Value>, IngestError> {
        let body = self.get("v1/accounts").await?;
        array_field(body, "accounts")
    }

    /// `GET v1/accounts/{id}/positions`: the `positions` array.
    pub async fn positions(&self, account_id: &str) -> Result<Vec<Value>, IngestError> {
        let body = self.get(&format!("v1/accounts/{account_id}/positions")).await?;
        array_field(body, "positions")
    }

    /// `GET v1/accounts/{id}/balances`: the whole response object.
    pub async fn balances(&self, account_id: &str) -> Result<Value, IngestError> {
        self.get(&format!("v1/accounts/{account_id}/balances")).await
    }

    /// Activity history over `lookback_windows` windows ending today.
    pub async fn fetch_activity(
        &self,
        account_id: &str,
        lookback_windows: u32,
    ) -> Result<Vec<Value>, IngestError> {
        self.fetch_activity_from(account_id, lookback_windows, UtcDateTime::now())
            .await
    }

    pub async fn fetch_activity_from(
        &self,
        account_id: &str,
        lookback_windows: u32,
        now: UtcDateTime,
    ) -> Result<Vec<Value>, IngestError> {
        let activities = self
            .windower
            .fetch(now, lookback_windows, |window| {
                let path = activities_path(account_id, window);
                async move { self.get(&path).await }
            })
            .await?;

        debug!(account = %account_id, activities = activities.len(), "fetched activity history");
        Ok(activities)
    }
}

fn activities_path(account_id: &str, window: Window) -> String {
    format!(
        "v1/accounts/{account_id}/activities?startTime={}&endTime={}",
        urlencoding::encode(&window.start.format_iso()),
        urlencoding::encode(&window.end.format_iso()),
    )
}

fn array_field(body: Value, field: &str) -> Result<Vec<Value>, IngestError> {
    match body {
        Value::Object(mut body) => match body.remove(field) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(IngestError::parse(field, format!("response has no {field} array"))),
        },
        _ => Err(IngestError::parse(field, "response is not an object")),
    }
}

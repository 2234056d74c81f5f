//! Questrade OAuth refresh-token exchange and token-file persistence.
//!
//! Questrade refresh tokens are single use: every successful exchange returns
//! a new refresh token, so the full login payload is written back to the
//! token file (stamped with `written`, epoch milliseconds) before any API
//! call is made.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::http_client::{fetch_json, HttpClient, HttpRequest};
use crate::IngestError;

/// Result of a refresh-token exchange.
#[derive(Clone, PartialEq)]
pub struct AccessGrant {
    pub access_token: String,
    /// Base URL for account calls, always ending in `/`.
    pub api_host: String,
    /// Login payload as returned, including the next refresh token.
    pub raw: Value,
}

impl AccessGrant {
    pub fn from_payload(raw: Value) -> Result<Self, IngestError> {
        let access_token = raw
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| IngestError::auth("login response has no access_token"))?
            .to_owned();
        let api_host = raw
            .get("api_server")
            .and_then(Value::as_str)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| IngestError::auth("login response has no api_server"))?;
        let api_host = if api_host.ends_with('/') {
            api_host.to_owned()
        } else {
            format!("{api_host}/")
        };

        Ok(Self {
            access_token,
            api_host,
            raw,
        })
    }
}

impl Debug for AccessGrant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGrant")
            .field("access_token", &"<redacted>")
            .field("api_host", &self.api_host)
            .finish_non_exhaustive()
    }
}

/// Exchanges a refresh token for an access grant.
pub trait TokenProvider: Send + Sync {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessGrant, IngestError>> + Send + 'a>>;
}

/// Questrade login host client.
#[derive(Clone)]
pub struct QuestradeLogin {
    http_client: Arc<dyn HttpClient>,
    login_host: String,
    timeout_ms: u64,
}

impl QuestradeLogin {
    pub fn new(http_client: Arc<dyn HttpClient>, login_host: impl Into<String>, timeout_ms: u64) -> Self {
        let login_host = login_host.into();
        let login_host = if login_host.ends_with('/') {
            login_host
        } else {
            format!("{login_host}/")
        };

        Self {
            http_client,
            login_host,
            timeout_ms,
        }
    }
}

impl TokenProvider for QuestradeLogin {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessGrant, IngestError>> + Send + 'a>> {
        Box::pin(async move {
            let form = format!(
                "grant_type=refresh_token&refresh_token={}",
                urlencoding::encode(refresh_token)
            );
            let request = HttpRequest::post(format!("{}oauth2/token?{form}", self.login_host))
                .with_header("content-type", "application/x-www-form-urlencoded")
                .with_body(form)
                .with_timeout_ms(self.timeout_ms);

            let payload = fetch_json(self.http_client.as_ref(), request)
                .await
                .map_err(|error| match error {
                    IngestError::Transport {
                        status: Some(400), ..
                    } => IngestError::auth("login host rejected the refresh token; issue a new one from the API dashboard"),
                    other => other,
                })?;

            let grant = AccessGrant::from_payload(payload)?;
            debug!(api_host = %grant.api_host, "refresh token exchanged");
            Ok(grant)
        })
    }
}

/// JSON token file holding at least `refresh_token` and `written`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An explicitly supplied token wins over the file.
    pub fn resolve_refresh_token(&self, explicit: Option<&str>) -> Result<String, IngestError> {
        match explicit.map(str::trim).filter(|token| !token.is_empty()) {
            Some(token) => Ok(token.to_owned()),
            None => self.load_refresh_token(),
        }
    }

    pub fn load_refresh_token(&self) -> Result<String, IngestError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(IngestError::auth(format!(
                    "no refresh token supplied and no token file at {}",
                    self.path.display()
                )));
            }
            Err(error) => return Err(IngestError::io(self.path.display().to_string(), error)),
        };

        let stored: Value = serde_json::from_str(&content).map_err(|error| {
            IngestError::auth(format!("token file {} is not valid JSON: {error}", self.path.display()))
        })?;

        stored
            .get("refresh_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                IngestError::auth(format!("token file {} has no refresh_token", self.path.display()))
            })
    }

    /// Writes `payload` plus a `written` epoch-millisecond stamp.
    pub fn persist(&self, payload: &Value) -> Result<(), IngestError> {
        let mut stored = match payload {
            Value::Object(map) => map.clone(),
            _ => return Err(IngestError::auth("login payload is not a JSON object")),
        };
        stored.insert(String::from("written"), Value::from(epoch_millis()));

        let body = serde_json::to_string(&stored)
            .map_err(|error| IngestError::parse("token", error.to_string()))?;
        std::fs::write(&self.path, body)
            .map_err(|error| IngestError::io(self.path.display().to_string(), error))?;

        info!(path = %self.path.display(), "persisted refreshed token");
        Ok(())
    }
}

fn epoch_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

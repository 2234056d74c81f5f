use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

use crate::IngestError;

/// HTTP methods used against brokerage hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Authentication strategy applied to outgoing HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    BearerToken(String),
}

impl HttpAuth {
    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        match self {
            Self::BearerToken(token) => {
                headers.insert(String::from("authorization"), format!("Bearer {token}"));
            }
        }
    }
}

/// HTTP request envelope handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 10_000,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// HTTP response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level failure: the request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Fetcher contract: executes one request and returns the raw response.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// In-memory client serving canned responses by URL path suffix and keeping
/// every request it saw. Unrouted paths answer 404.
#[derive(Debug, Default)]
pub struct RecordingHttpClient {
    routes: Vec<(String, Result<HttpResponse, HttpError>)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `response` for requests whose path (query excluded) ends with
    /// `path_suffix`. The first matching route wins.
    pub fn route(mut self, path_suffix: impl Into<String>, response: HttpResponse) -> Self {
        self.routes.push((path_suffix.into(), Ok(response)));
        self
    }

    pub fn fail(mut self, path_suffix: impl Into<String>, error: HttpError) -> Self {
        self.routes.push((path_suffix.into(), Err(error)));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let path = redact_query(&request.url).to_owned();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let response = self
            .routes
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(HttpResponse::with_status(404, "")));
        Box::pin(async move { response })
    }
}

/// Executes `request` and decodes the body as JSON.
///
/// Network failures, non-2xx statuses and undecodable bodies all surface as
/// errors so an empty result is never confused with a failed call. 401 and
/// 403 are reported as authentication failures.
pub async fn fetch_json(client: &dyn HttpClient, request: HttpRequest) -> Result<Value, IngestError> {
    let url = request.url.clone();
    debug!(url = %redact_query(&url), "requesting");

    let response = client
        .execute(request)
        .await
        .map_err(|error| IngestError::transport(redact_query(&url), None, error.message()))?;

    if response.status == 401 || response.status == 403 {
        return Err(IngestError::auth(format!(
            "{} rejected the access token (status {})",
            redact_query(&url),
            response.status
        )));
    }

    if !response.is_success() {
        return Err(IngestError::transport(
            redact_query(&url),
            Some(response.status),
            format!("upstream returned status {}", response.status),
        ));
    }

    serde_json::from_str(&response.body).map_err(|error| {
        IngestError::transport(
            redact_query(&url),
            Some(response.status),
            format!("response is not valid JSON: {error}"),
        )
    })
}

/// Strips the query string so refresh tokens never reach logs or errors.
pub fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Production HTTP client backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("brokersync/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(std::time::Duration::from_millis(request.timeout_ms));

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {}", e.without_url()))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {}", e.without_url()))
                } else {
                    HttpError::new(format!("request failed: {}", e.without_url()))
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {}", e.without_url())))?;

            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl FixedHttpClient {
        fn new(response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for FixedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    #[test]
    fn bearer_auth_populates_authorization_header() {
        let request = HttpRequest::get("https://api01.iq.questrade.com/v1/accounts")
            .with_auth(&HttpAuth::BearerToken(String::from("token-123")));

        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer token-123")
        );
    }

    #[test]
    fn redacts_query_strings() {
        assert_eq!(
            redact_query("https://login.test/oauth2/token?refresh_token=secret"),
            "https://login.test/oauth2/token"
        );
        assert_eq!(redact_query("https://api.test/v1"), "https://api.test/v1");
    }

    #[tokio::test]
    async fn decodes_successful_json_bodies() {
        let client = FixedHttpClient::new(Ok(HttpResponse::ok_json(r#"{"accounts":[]}"#)));
        let value = fetch_json(&client, HttpRequest::get("https://api.test/v1/accounts"))
            .await
            .expect("must decode");

        assert_eq!(value["accounts"], serde_json::json!([]));
        assert_eq!(client.requests.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn unauthorized_status_is_an_auth_error() {
        let client = FixedHttpClient::new(Ok(HttpResponse::with_status(401, "")));
        let error = fetch_json(&client, HttpRequest::get("https://api.test/v1/accounts"))
            .await
            .expect_err("must fail");

        assert!(matches!(error, IngestError::Auth { .. }));
    }

    #[tokio::test]
    async fn server_errors_and_bad_bodies_are_transport_errors() {
        let client = FixedHttpClient::new(Ok(HttpResponse::with_status(502, "bad gateway")));
        let error = fetch_json(&client, HttpRequest::get("https://api.test/v1/accounts"))
            .await
            .expect_err("must fail");
        assert!(matches!(error, IngestError::Transport { status: Some(502), .. }));

        let client = FixedHttpClient::new(Ok(HttpResponse::ok_json("<html>")));
        let error = fetch_json(&client, HttpRequest::get("https://api.test/v1/accounts"))
            .await
            .expect_err("must fail");
        assert!(matches!(error, IngestError::Transport { status: Some(200), .. }));
    }

    #[tokio::test]
    async fn recording_client_routes_by_path_and_ignores_query() {
        let client = RecordingHttpClient::new()
            .route("/v1/accounts", HttpResponse::ok_json(r#"{"accounts":[]}"#))
            .fail("/balances", HttpError::new("reset"));

        let accounts = fetch_json(&client, HttpRequest::get("https://api.test/v1/accounts?x=1")).await;
        let balances = fetch_json(&client, HttpRequest::get("https://api.test/v1/accounts/1/balances")).await;
        let missing = fetch_json(&client, HttpRequest::get("https://api.test/v1/markets")).await;

        assert!(accounts.is_ok());
        assert!(matches!(balances, Err(IngestError::Transport { status: None, .. })));
        assert!(matches!(missing, Err(IngestError::Transport { status: Some(404), .. })));
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn network_failures_have_no_status() {
        let client = FixedHttpClient::new(Err(HttpError::new("connection reset")));
        let error = fetch_json(&client, HttpRequest::get("https://api.test/v1/accounts"))
            .await
            .expect_err("must fail");

        assert!(matches!(error, IngestError::Transport { status: None, .. }));
    }
}

// Shared HTTP transport for the Sector API.
//
// Owns the `reqwest::Client`, the vendor's fixed request headers and the
// retry policy. Holds no session state: the bearer token, when needed, is
// handed in per call by the authenticated client.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::TransportError;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://mypagesapi.sectoralarm.net/api/";

/// Vendor API version sent on every request.
const API_VERSION: &str = "6";
/// Platform/app identification the service expects from its own mobile app.
const PLATFORM: &str = "iOS";
const APP_VERSION: &str = "2.0.27";
const DEFAULT_USER_AGENT: &str = "SectorAlarm/387 CFNetwork/1206 Darwin/20.1.0";

/// Longest body excerpt kept in error values.
const BODY_PREVIEW_CHARS: usize = 200;

/// Backoff schedule for transient failures of idempotent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.base_delay
            .saturating_mul(self.factor.saturating_pow(exponent))
    }
}

/// Settings for building a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// API root. A missing trailing `/` is added so relative paths join below it.
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// One request against the API, relative to the base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    idempotent: bool,
}

impl ApiRequest {
    /// A read. GETs are idempotent and therefore retried on transient failure.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            idempotent: true,
        }
    }

    /// A JSON POST. Sent exactly once unless marked [`idempotent`](Self::idempotent).
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            idempotent: false,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Allow retries for a POST that has no side effects (login).
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }
}

/// HTTP transport: vendor headers, per-request timeout, retry with backoff.
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(vendor_headers())
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send `request`, retrying transient failures when it is idempotent.
    ///
    /// Returns the decoded JSON body; an empty 2xx body yields `Value::Null`.
    pub async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<Value, TransportError> {
        let url = self.url_for(request)?;
        let max_attempts = if request.idempotent {
            self.retry.max_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match self.send_once(&url, request, bearer).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        method = %request.method,
                        path = %request.path,
                        attempt,
                        error = %e,
                        ?delay,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        url: &Url,
        request: &ApiRequest,
        bearer: Option<&SecretString>,
    ) -> Result<Value, TransportError> {
        debug!("{} {}", request.method, url);

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, bearer_header(token)?);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            trace!(status = status.as_u16(), "error response");
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode {
            message: e.to_string(),
            body: preview(&body),
        })
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", request.path)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, TransportError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))
}

fn vendor_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("API-Version", HeaderValue::from_static(API_VERSION));
    headers.insert("Platform", HeaderValue::from_static(PLATFORM));
    headers.insert("Version", HeaderValue::from_static(APP_VERSION));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

fn bearer_header(token: &SecretString) -> Result<HeaderValue, TransportError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|_| TransportError::InvalidRequest("token is not a valid header value".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

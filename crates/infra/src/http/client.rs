use std::time::Duration;

use auditbridge_domain::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, USER_AGENT};
use auditbridge_domain::ApiError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

/// HTTP client with a per-request timeout and classified errors.
///
/// Every call is a single attempt. Retries are decided by the caller's retry
/// policy, which needs to see each failure.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, ApiError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the request once and return the response if its status is a
    /// success.
    ///
    /// # Errors
    /// Transport failures map to `Network`/`Timeout`; non-success statuses are
    /// classified with [`ApiError::from_status`] and carry the response body.
    /// A 429 also carries its `Retry-After` delay when given in seconds.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build().map_err(|err| ApiError::Config(format!("invalid request: {err}")))?;
        let method = request.method().clone();
        let url = redact_query(request.url());
        debug!(%method, %url, "sending HTTP request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(%method, %url, error = %err, "HTTP request failed");
            self.map_transport_error(&err)
        })?;

        let status = response.status();
        debug!(%method, %url, %status, "received HTTP response");
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status.as_u16(), truncate(body)).with_retry_after(retry_after))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if err.is_builder() {
            ApiError::Config(err.to_string())
        } else if err.is_decode() {
            ApiError::Payload(err.to_string())
        } else {
            ApiError::Network(format!("HTTP request failed: {err}"))
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: String,
    default_headers: Option<reqwest::header::HeaderMap>,
    verify_ssl: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            default_headers: None,
            verify_ssl: true,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Disable certificate verification (self-signed HEC endpoints).
    pub fn verify_ssl(mut self, enabled: bool) -> Self {
        self.verify_ssl = enabled;
        self
    }

    pub fn build(self) -> Result<HttpClient, ApiError> {
        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).user_agent(self.user_agent).no_proxy();

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        if !self.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|err| ApiError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client, timeout: self.timeout })
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Cap error bodies so a misbehaving server cannot flood the logs.
fn truncate(mut body: String) -> String {
    const MAX_BODY: usize = 512;
    if body.len() > MAX_BODY {
        let mut cut = MAX_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

/// Continuation tokens are opaque and may be long; log the path only.
fn redact_query(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

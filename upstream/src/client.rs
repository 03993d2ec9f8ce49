use crate::config::{Timeouts, UpstreamConfig};
use crate::errors::UpstreamError;
use crate::metrics_defs::{UPSTREAM_REQUEST_DURATION, UPSTREAM_REQUEST_FAILURES};
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use url::Url;

/// Status line and body of an upstream answer, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Performs a single GET against an upstream.
///
/// Implementations report only transport problems as errors. Any HTTP status,
/// including 404 and 5xx, is a response. Deadlines are enforced by
/// [`UpstreamClient`], not by the transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, upstream: &str, url: Url) -> Result<RawResponse, UpstreamError>;
}

/// [`Transport`] backed by a pooled reqwest client.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, upstream: &str, url: Url) -> Result<RawResponse, UpstreamError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(upstream, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(upstream, e))?;

        Ok(RawResponse { status, body })
    }
}

fn classify_reqwest_error(upstream: &str, e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout(upstream.to_string())
    } else if e.is_connect() {
        UpstreamError::Connect(upstream.to_string(), e.to_string())
    } else {
        UpstreamError::RequestFailed(upstream.to_string(), e.to_string())
    }
}

/// A named dependency with its base URL and per-call deadline.
#[derive(Clone, Debug, PartialEq)]
pub struct Upstream {
    pub name: String,
    pub base_url: Url,
    pub timeout: Duration,
}

impl Upstream {
    pub fn new(name: impl Into<String>, base_url: Url, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            base_url,
            timeout,
        }
    }

    pub fn from_config(
        name: impl Into<String>,
        config: &UpstreamConfig,
        timeouts: &Timeouts,
    ) -> Self {
        Self::new(name, config.url.clone(), config.timeout(timeouts))
    }

    /// Same upstream with a different deadline, used for liveness checks.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// Appends `path` to the base URL and sets the raw query string unchanged.
    pub fn url(&self, path: &str, query: Option<&str>) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.name.clone(), self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }
}

/// One request to issue against an upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub upstream: Upstream,
    pub path: String,
    pub query: Option<String>,
}

impl Call {
    pub fn new(upstream: &Upstream, path: impl Into<String>) -> Self {
        Self {
            upstream: upstream.clone(),
            path: path.into(),
            query: None,
        }
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }
}

/// A completed upstream call, whatever its HTTP status.
#[derive(Debug, Clone)]
pub struct Reply {
    pub upstream: String,
    pub status: StatusCode,
    pub body: Bytes,
    pub latency: Duration,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    pub fn json(&self) -> Result<JsonValue, UpstreamError> {
        self.decode()
    }

    /// Decodes the body into a typed record. A missing required field is a
    /// failure of the upstream, not something to paper over with defaults.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, UpstreamError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| UpstreamError::InvalidPayload(self.upstream.clone(), e.to_string()))
    }
}

/// Result of one upstream call.
pub type Outcome = Result<Reply, UpstreamError>;

/// Issues single bounded-timeout calls. Cheap to clone; no retries.
#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn Transport>,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn http() -> Self {
        Self::new(Arc::new(HttpTransport::new()))
    }

    pub async fn execute(&self, call: &Call) -> Outcome {
        self.call(&call.upstream, &call.path, call.query.as_deref())
            .await
    }

    /// Sends one GET to `upstream`. The whole exchange, body included, must
    /// finish within the upstream's timeout or the call fails.
    pub async fn call(&self, upstream: &Upstream, path: &str, query: Option<&str>) -> Outcome {
        let result = match upstream.url(path, query) {
            Ok(url) => self.send(upstream, url).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!(upstream = %upstream.name, path, error = %e, "upstream call failed");
            counter!(
                UPSTREAM_REQUEST_FAILURES,
                "upstream" => upstream.name.clone(),
                "reason" => e.reason()
            )
            .increment(1);
        }

        result
    }

    async fn send(&self, upstream: &Upstream, url: Url) -> Outcome {
        let start = Instant::now();

        let raw = timeout(upstream.timeout, self.transport.get(&upstream.name, url))
            .await
            .map_err(|_| UpstreamError::Timeout(upstream.name.clone()))??;

        let latency = start.elapsed();
        histogram!(
            UPSTREAM_REQUEST_DURATION,
            "upstream" => upstream.name.clone(),
            "outcome" => raw.status.as_str().to_owned()
        )
        .record(latency.as_secs_f64());

        Ok(Reply {
            upstream: upstream.name.clone(),
            status: raw.status,
            body: raw.body,
            latency,
        })
    }
}

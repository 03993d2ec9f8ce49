//! In-memory upstream for tests.

use crate::client::{RawResponse, Transport};
use crate::errors::UpstreamError;
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Clone)]
enum Canned {
    Respond(StatusCode, Bytes),
    Fail(UpstreamError),
}

#[derive(Clone)]
struct Route {
    canned: Canned,
    delay: Option<Duration>,
}

/// Deterministic [`Transport`] keyed by URL (query excluded).
///
/// Unknown URLs behave like a refused connection. Every request is recorded,
/// so tests can assert which upstream calls were or were not made.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<Url>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: StatusCode, body: JsonValue) {
        self.insert(url, Canned::Respond(status, Bytes::from(body.to_string())), None);
    }

    pub fn respond_raw(&self, url: &str, status: StatusCode, body: &'static str) {
        self.insert(url, Canned::Respond(status, Bytes::from_static(body.as_bytes())), None);
    }

    pub fn respond_after(&self, url: &str, delay: Duration, status: StatusCode, body: JsonValue) {
        self.insert(
            url,
            Canned::Respond(status, Bytes::from(body.to_string())),
            Some(delay),
        );
    }

    pub fn fail(&self, url: &str, error: UpstreamError) {
        self.insert(url, Canned::Fail(error), None);
    }

    /// Number of requests made to `url`, ignoring query strings.
    pub fn calls(&self, url: &str) -> usize {
        let key = route_key(&parse(url));
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|requested| route_key(requested) == key)
            .count()
    }

    /// All requested URLs in the order they were received.
    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }

    fn insert(&self, url: &str, canned: Canned, delay: Option<Duration>) {
        self.routes
            .lock()
            .unwrap()
            .insert(route_key(&parse(url)), Route { canned, delay });
    }
}

fn parse(url: &str) -> Url {
    Url::parse(url).expect("valid test url")
}

fn route_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, upstream: &str, url: Url) -> Result<RawResponse, UpstreamError> {
        let route = {
            self.requests.lock().unwrap().push(url.clone());
            self.routes.lock().unwrap().get(&route_key(&url)).cloned()
        };

        let Some(route) = route else {
            return Err(UpstreamError::Connect(
                upstream.to_string(),
                "connection refused".into(),
            ));
        };

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        match route.canned {
            Canned::Respond(status, body) => Ok(RawResponse { status, body }),
            Canned::Fail(e) => Err(e),
        }
    }
}

//! Decides what a set of upstream outcomes means for the caller.
//!
//! Two failure causes are kept apart everywhere in this module:
//! - The upstream answered, possibly with a domain-level error such as 404.
//!   Its status is reproduced for the caller.
//! - The upstream could not be observed at all (timeout, refused connection,
//!   unusable payload). This is always a 503.

use crate::client::{Outcome, Reply};
use crate::errors::UpstreamError;
use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

/// Composite result of a multi-dependency request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    /// Every upstream answered
    Full,
    /// Some upstreams answered, some could not be reached
    Degraded,
    /// No upstream answered
    Unavailable,
}

pub fn composite(outcomes: &[Outcome]) -> Composite {
    let answered = outcomes.iter().filter(|o| o.is_ok()).count();
    match answered {
        n if n == outcomes.len() => Composite::Full,
        0 => Composite::Unavailable,
        _ => Composite::Degraded,
    }
}

/// Whether an optional dependency contributed data to a best-effort response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Online,
    Offline,
}

/// Decodes an optional dependency's answer, falling back to an empty value.
///
/// Only a 200 with a well-formed body counts as online. Anything else yields
/// `T::default()` together with [`Availability::Offline`] so the caller can
/// report the gap instead of presenting empty data as real.
pub fn best_effort<T>(outcome: &Outcome) -> (T, Availability)
where
    T: DeserializeOwned + Default,
{
    let reply = match outcome {
        Ok(reply) if reply.status == StatusCode::OK => reply,
        Ok(reply) => {
            tracing::warn!(
                upstream = %reply.upstream,
                status = %reply.status,
                "optional dependency answered with error status"
            );
            return (T::default(), Availability::Offline);
        }
        Err(_) => return (T::default(), Availability::Offline),
    };

    match reply.decode() {
        Ok(value) => (value, Availability::Online),
        Err(e) => {
            tracing::warn!(
                upstream = %reply.upstream,
                error = %e,
                "optional dependency returned unusable payload"
            );
            (T::default(), Availability::Offline)
        }
    }
}

/// A JSON response on its way to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: JsonValue) -> Self {
        Self { status, body }
    }

    pub fn ok(body: JsonValue) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// 503 for an upstream that could not be observed.
    pub fn unavailable(label: &str, error: &UpstreamError) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({
                "error": format!("{label} unavailable"),
                "message": error.to_string(),
            }),
        )
    }

    pub fn not_found(error: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, json!({ "error": error }))
    }

    pub fn ok_json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::ok(body),
            Err(e) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Response serialization error", "message": e.to_string()}),
            ),
        }
    }

    /// Stamps the responding service's name onto an object body.
    pub fn with_service(mut self, service: &str) -> Self {
        if let JsonValue::Object(map) = &mut self.body {
            map.insert("service".into(), JsonValue::String(service.into()));
        }
        self
    }
}

/// A path segment that does not parse, such as a non-numeric id.
impl From<PathRejection> for ApiResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            rejection.status(),
            json!({"error": "Invalid path parameter", "message": rejection.body_text()}),
        )
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Reproduces an upstream answer for the caller.
///
/// The upstream status is kept as-is, 4xx and 5xx included. Only a call that
/// produced no answer, or an answer that is not JSON, becomes a 503.
pub fn passthrough(outcome: Outcome, label: &str) -> ApiResponse {
    match outcome {
        Ok(reply) => passthrough_reply(&reply, label),
        Err(e) => ApiResponse::unavailable(label, &e),
    }
}

pub fn passthrough_reply(reply: &Reply, label: &str) -> ApiResponse {
    match reply.json() {
        Ok(body) => ApiResponse::new(reply.status, body),
        Err(_) if reply.is_not_found() => ApiResponse::not_found("Not found"),
        Err(e) => ApiResponse::unavailable(label, &e),
    }
}

use crate::config::Config;
use crate::models::{Car, CarsEnvelope};
use crate::reports;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use http::StatusCode;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;
use upstream::aggregator::ApiResponse;
use upstream::client::{Upstream, UpstreamClient};
use upstream::dispatcher::Dispatcher;
use upstream::errors::UpstreamError;
use upstream::health::{DependencyStatus, rollup};
use upstream::join::round2;

pub const GARAGE_SERVICE: &str = "garage-service";

#[derive(Clone)]
pub struct Analytics {
    inner: Arc<AnalyticsInner>,
}

struct AnalyticsInner {
    name: String,
    garage: Upstream,
    dispatcher: Dispatcher,
    health_timeout: Duration,
}

impl Analytics {
    pub fn new(config: &Config, client: UpstreamClient) -> Self {
        Self {
            inner: Arc::new(AnalyticsInner {
                name: config.name.clone(),
                garage: Upstream::from_config(GARAGE_SERVICE, &config.garage, &config.timeouts),
                dispatcher: Dispatcher::new(client),
                health_timeout: config.timeouts.health(),
            }),
        }
    }

    /// One read of the whole garage. Any answer other than a decodable 2xx is
    /// a failure to reach the store.
    async fn cars(&self) -> Result<Vec<Car>, ApiResponse> {
        let outcome = self
            .inner
            .dispatcher
            .client()
            .call(&self.inner.garage, "cars", None)
            .await;

        let result = match outcome {
            Ok(reply) if reply.is_success() => reply.decode::<CarsEnvelope>(),
            Ok(reply) => Err(UpstreamError::RequestFailed(
                reply.upstream.clone(),
                format!("unexpected status {}", reply.status),
            )),
            Err(e) => Err(e),
        };

        result.map(|envelope| envelope.cars).map_err(|e| {
            tracing::warn!(error = %e, "garage read failed");
            ApiResponse::new(
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "Unable to connect to Garage Service",
                    "message": e.to_string(),
                    "service": self.inner.name,
                }),
            )
        })
    }
}

pub fn router(analytics: Analytics) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/report", get(report))
        .route("/report/{id}", get(car_report))
        .route("/summary", get(summary))
        .route("/activity", get(activity))
        .route("/health", get(health))
        .with_state(analytics)
}

async fn index(State(analytics): State<Analytics>) -> Json<JsonValue> {
    Json(json!({
        "service": analytics.inner.name,
        "description": "Garage analytics and reports",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /": "Service information",
            "GET /report": "Complete report of all cars",
            "GET /report/<id>": "Detailed report of a specific car",
            "GET /summary": "Executive summary with aggregations",
            "GET /activity": "Activity analysis",
            "GET /health": "Health check (includes Garage Service)",
        },
        "garage_service": analytics.inner.garage.base_url.as_str(),
    }))
}

async fn report(State(analytics): State<Analytics>) -> Result<ApiResponse, ApiResponse> {
    let cars = analytics.cars().await?;
    Ok(ApiResponse::ok_json(&reports::complete_report(
        &analytics.inner.name,
        cars,
        Utc::now(),
    )))
}

async fn car_report(
    State(analytics): State<Analytics>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let Path(id) = id?;
    let cars = analytics.cars().await?;
    let name = &analytics.inner.name;

    Ok(match reports::detailed_report(name, &cars, id, Utc::now()) {
        Some(report) => ApiResponse::ok_json(&report),
        None => ApiResponse::new(
            StatusCode::NOT_FOUND,
            json!({"error": "Car not found", "car_id": id, "service": name}),
        ),
    })
}

async fn summary(State(analytics): State<Analytics>) -> Result<ApiResponse, ApiResponse> {
    let cars = analytics.cars().await?;
    Ok(ApiResponse::ok_json(&reports::summary(
        &analytics.inner.name,
        &cars,
        Utc::now(),
    )))
}

async fn activity(State(analytics): State<Analytics>) -> Result<ApiResponse, ApiResponse> {
    let cars = analytics.cars().await?;
    Ok(ApiResponse::ok_json(&reports::activity(
        &analytics.inner.name,
        &cars,
        Utc::now(),
    )))
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Connectivity {
    Ok,
    Degraded,
    Failed,
}

#[derive(Serialize)]
struct AnalyticsHealth<'a> {
    service: &'a str,
    analytics_service: &'static str,
    garage_service: DependencyStatus,
    connectivity: Connectivity,
    latency_ms: Option<f64>,
    overall: &'static str,
    timestamp: String,
}

async fn health(State(analytics): State<Analytics>) -> Response {
    let inner = &analytics.inner;
    let timestamp = reports::timestamp(Utc::now());
    let report = rollup(
        &inner.dispatcher,
        std::slice::from_ref(&inner.garage),
        inner.health_timeout,
    )
    .await;

    let (garage_service, latency_ms) = match report.services.get(GARAGE_SERVICE) {
        Some(garage) => (garage.status, garage.latency_ms.map(round2)),
        None => (DependencyStatus::Unreachable, None),
    };
    let connectivity = match garage_service {
        DependencyStatus::Healthy => Connectivity::Ok,
        DependencyStatus::Unhealthy => Connectivity::Degraded,
        DependencyStatus::Unreachable => Connectivity::Failed,
    };

    let healthy = report.is_healthy();
    let body = AnalyticsHealth {
        service: &inner.name,
        analytics_service: "healthy",
        garage_service,
        connectivity,
        latency_ms,
        overall: if healthy { "healthy" } else { "degraded" },
        timestamp,
    };

    (report.status_code(), Json(body)).into_response()
}

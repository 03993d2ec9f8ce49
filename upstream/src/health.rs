//! Liveness rollup over every configured dependency.

use crate::client::{Call, Outcome, Upstream};
use crate::dispatcher::Dispatcher;
use crate::metrics_defs::HEALTH_CHECK;
use http::StatusCode;
use indexmap::IndexMap;
use serde::Serialize;
use shared::counter;
use std::time::Duration;

pub const HEALTH_PATH: &str = "health";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Healthy,
    Unhealthy,
    Unreachable,
}

impl DependencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyStatus::Healthy => "healthy",
            DependencyStatus::Unhealthy => "unhealthy",
            DependencyStatus::Unreachable => "unreachable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyHealth {
    pub status: DependencyStatus,
    /// Round trip in milliseconds; absent when the dependency was unreachable
    #[serde(rename = "response_time_ms", skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

impl DependencyHealth {
    /// 200 is healthy, any other answer is unhealthy, no answer is unreachable.
    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Ok(reply) => Self {
                status: if reply.status == StatusCode::OK {
                    DependencyStatus::Healthy
                } else {
                    DependencyStatus::Unhealthy
                },
                latency_ms: Some(reply.latency_ms()),
            },
            Err(_) => Self {
                status: DependencyStatus::Unreachable,
                latency_ms: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub services: IndexMap<String, DependencyHealth>,
    pub overall_status: OverallStatus,
}

impl HealthReport {
    pub fn from_outcomes<'a>(entries: impl IntoIterator<Item = (&'a str, &'a Outcome)>) -> Self {
        let services: IndexMap<String, DependencyHealth> = entries
            .into_iter()
            .map(|(name, outcome)| (name.to_string(), DependencyHealth::from_outcome(outcome)))
            .collect();

        let overall_status = if services
            .values()
            .all(|dep| dep.status == DependencyStatus::Healthy)
        {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        };

        Self {
            services,
            overall_status,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.overall_status == OverallStatus::Healthy
    }

    /// 200 when every dependency is healthy, 503 otherwise.
    pub fn status_code(&self) -> StatusCode {
        match self.overall_status {
            OverallStatus::Healthy => StatusCode::OK,
            OverallStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Checks every dependency's liveness path concurrently with `timeout`.
///
/// Each check is isolated: a hung or failing dependency only affects its own
/// entry in the report.
pub async fn rollup(
    dispatcher: &Dispatcher,
    dependencies: &[Upstream],
    timeout: Duration,
) -> HealthReport {
    let calls = dependencies
        .iter()
        .map(|dep| Call::new(&dep.with_timeout(timeout), HEALTH_PATH))
        .collect();

    let outcomes = dispatcher.dispatch(calls).await;

    let report = HealthReport::from_outcomes(
        dependencies
            .iter()
            .map(|dep| dep.name.as_str())
            .zip(outcomes.iter()),
    );

    for (name, dep) in &report.services {
        counter!(HEALTH_CHECK, "dependency" => name.clone(), "status" => dep.status.as_str())
            .increment(1);
        if dep.status != DependencyStatus::Healthy {
            tracing::warn!(
                dependency = %name,
                status = dep.status.as_str(),
                "dependency not healthy"
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::UpstreamClient;
    use crate::testutils::FakeTransport;
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;

    fn deps() -> Vec<Upstream> {
        ["users", "orders"]
            .into_iter()
            .map(|name| {
                let url = Url::parse(&format!("http://{name}")).unwrap();
                Upstream::new(format!("{name}-service"), url, Duration::from_secs(5))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_all_healthy() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond("http://users/health", StatusCode::OK, json!({"status": "healthy"}));
        fake.respond("http://orders/health", StatusCode::OK, json!({"status": "healthy"}));
        let dispatcher = Dispatcher::new(UpstreamClient::new(fake.clone()));

        let report = rollup(&dispatcher, &deps(), Duration::from_secs(2)).await;

        assert!(report.is_healthy());
        assert_eq!(report.status_code(), StatusCode::OK);
        assert_eq!(report.services.len(), 2);
    }

    #[tokio::test]
    async fn test_one_timeout_degrades() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond_after(
            "http://users/health",
            Duration::from_millis(5),
            StatusCode::OK,
            json!({"status": "healthy"}),
        );
        fake.respond_after(
            "http://orders/health",
            Duration::from_secs(10),
            StatusCode::OK,
            json!({}),
        );
        let dispatcher = Dispatcher::new(UpstreamClient::new(fake.clone()));

        // Health timeout is shorter than the configured request timeout
        let report = rollup(&dispatcher, &deps(), Duration::from_millis(200)).await;

        assert_eq!(report.overall_status, OverallStatus::Degraded);
        assert_eq!(report.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let users = &report.services["users-service"];
        assert_eq!(users.status, DependencyStatus::Healthy);
        assert!(users.latency_ms.unwrap() > 0.0);

        let orders = &report.services["orders-service"];
        assert_eq!(orders.status, DependencyStatus::Unreachable);
        assert_eq!(orders.latency_ms, None);

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["overall_status"], "degraded");
        assert_eq!(body["services"]["orders-service"], json!({"status": "unreachable"}));
    }

    #[tokio::test]
    async fn test_non_200_is_unhealthy() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond("http://users/health", StatusCode::INTERNAL_SERVER_ERROR, json!({}));
        fake.respond_raw("http://orders/health", StatusCode::OK, "not json");
        let dispatcher = Dispatcher::new(UpstreamClient::new(fake.clone()));

        let report = rollup(&dispatcher, &deps(), Duration::from_secs(1)).await;

        assert_eq!(report.services["users-service"].status, DependencyStatus::Unhealthy);
        assert!(report.services["users-service"].latency_ms.is_some());
        // Liveness only looks at the status line
        assert_eq!(report.services["orders-service"].status, DependencyStatus::Healthy);
        assert!(!report.is_healthy());
    }

    #[tokio::test]
    async fn test_report_order_follows_config() {
        let fake = Arc::new(FakeTransport::new());
        let dispatcher = Dispatcher::new(UpstreamClient::new(fake.clone()));

        let report = rollup(&dispatcher, &deps(), Duration::from_secs(1)).await;

        let names: Vec<_> = report.services.keys().cloned().collect();
        assert_eq!(names, vec!["users-service", "orders-service"]);
        assert!(report.services.values().all(|d| d.status == DependencyStatus::Unreachable));
    }
}

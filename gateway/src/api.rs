use crate::config::Config;
use crate::views;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, RawQuery, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;
use upstream::aggregator::{ApiResponse, passthrough};
use upstream::client::{Upstream, UpstreamClient};
use upstream::dispatcher::Dispatcher;
use upstream::health::{HealthReport, rollup};

pub const USERS_SERVICE: &str = "users-service";
pub const ORDERS_SERVICE: &str = "orders-service";

/// Request-independent state shared by all handlers. Read-only.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    name: String,
    users: Upstream,
    orders: Upstream,
    dispatcher: Dispatcher,
    health_timeout: Duration,
    normalize_empty_filters: bool,
}

impl Gateway {
    pub fn new(config: &Config, client: UpstreamClient) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                name: config.name.clone(),
                users: Upstream::from_config(USERS_SERVICE, &config.users, &config.timeouts),
                orders: Upstream::from_config(ORDERS_SERVICE, &config.orders, &config.timeouts),
                dispatcher: Dispatcher::new(client),
                health_timeout: config.timeouts.health(),
                normalize_empty_filters: config.normalize_empty_filters,
            }),
        }
    }

    async fn forward(
        &self,
        upstream: &Upstream,
        label: &str,
        path: String,
        query: Option<String>,
    ) -> ApiResponse {
        let outcome = self
            .inner
            .dispatcher
            .client()
            .call(upstream, &path, query.as_deref())
            .await;
        passthrough(outcome, label).with_service(&self.inner.name)
    }

    /// Filter endpoints of the record stores disagree on "nothing matched":
    /// some answer 200 with an empty list, others 404 with an `error` body.
    ///
    /// `value` is echoed with its own JSON type, so a numeric id stays a number.
    async fn filter(
        &self,
        upstream: &Upstream,
        label: &str,
        filter: Filter<'_>,
        value: JsonValue,
    ) -> ApiResponse {
        let segment = match &value {
            JsonValue::String(text) => text.clone(),
            other => other.to_string(),
        };
        let path = format!("{}/{}/{}", filter.resource, filter.segment, segment);
        let outcome = self.inner.dispatcher.client().call(upstream, &path, None).await;

        let response = match outcome {
            Ok(reply) if self.inner.normalize_empty_filters && reply.is_not_found() => {
                match reply.json() {
                    Ok(body) if body.get("error").is_some() => {
                        let mut body = json!({ "total": 0, "normalized": true });
                        body[filter.resource] = json!([]);
                        body[filter.field] = value;
                        ApiResponse::ok(body)
                    }
                    _ => passthrough(Ok(reply), label),
                }
            }
            other => passthrough(other, label),
        };

        response.with_service(&self.inner.name)
    }
}

#[derive(Clone, Copy)]
struct Filter<'a> {
    /// Collection key, also the first path segment
    resource: &'a str,
    /// Path segment naming the filter
    segment: &'a str,
    /// Key echoing the filter value in the response
    field: &'a str,
}

const USERS_BY_DRINK: Filter<'static> = Filter {
    resource: "users",
    segment: "drink",
    field: "favorite_drink",
};
const ORDERS_BY_USER: Filter<'static> = Filter {
    resource: "orders",
    segment: "user",
    field: "user_id",
};
const ORDERS_BY_STATUS: Filter<'static> = Filter {
    resource: "orders",
    segment: "status",
    field: "status",
};
const ORDERS_BY_CATEGORY: Filter<'static> = Filter {
    resource: "orders",
    segment: "category",
    field: "category",
};

pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/drink/{drink}", get(users_by_drink))
        .route("/users/{id}/orders", get(user_orders))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/user/{user_id}", get(orders_by_user))
        .route("/orders/status/{status}", get(orders_by_status))
        .route("/orders/category/{category}", get(orders_by_category))
        .route("/dashboard", get(dashboard))
        .route("/health", get(health))
        .with_state(gateway)
}

async fn index(State(gateway): State<Gateway>) -> Json<JsonValue> {
    Json(json!({
        "service": gateway.inner.name,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Gateway in front of the users and orders services",
        "available_endpoints": {
            "users": [
                "GET /users - List all users",
                "GET /users/<id> - Get user by ID",
                "GET /users/drink/<drink> - Filter by favorite drink",
            ],
            "orders": [
                "GET /orders - List all orders",
                "GET /orders/<id> - Get order by ID",
                "GET /orders/user/<user_id> - Get orders by user",
                "GET /orders/status/<status> - Filter orders by status",
                "GET /orders/category/<category> - Filter by category",
            ],
            "combined": [
                "GET /users/<id>/orders - Get user with their orders",
                "GET /dashboard - Get dashboard with statistics",
            ],
            "health": ["GET /health - Health check of all services"],
        },
    }))
}

async fn list_users(State(gateway): State<Gateway>, RawQuery(query): RawQuery) -> ApiResponse {
    let inner = &gateway.inner;
    gateway.forward(&inner.users, "Users service", "users".into(), query).await
}

async fn get_user(
    State(gateway): State<Gateway>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let Path(id) = id?;
    let inner = &gateway.inner;
    Ok(gateway.forward(&inner.users, "Users service", format!("users/{id}"), None).await)
}

async fn users_by_drink(
    State(gateway): State<Gateway>,
    Path(drink): Path<String>,
) -> ApiResponse {
    let inner = &gateway.inner;
    gateway
        .filter(&inner.users, "Users service", USERS_BY_DRINK, JsonValue::String(drink))
        .await
}

async fn user_orders(
    State(gateway): State<Gateway>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let Path(id) = id?;
    let inner = &gateway.inner;
    let view =
        views::user_with_orders(&inner.name, &inner.dispatcher, &inner.users, &inner.orders, id);
    Ok(view.await)
}

async fn list_orders(State(gateway): State<Gateway>, RawQuery(query): RawQuery) -> ApiResponse {
    let inner = &gateway.inner;
    gateway.forward(&inner.orders, "Orders service", "orders".into(), query).await
}

async fn get_order(
    State(gateway): State<Gateway>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let Path(id) = id?;
    let inner = &gateway.inner;
    Ok(gateway.forward(&inner.orders, "Orders service", format!("orders/{id}"), None).await)
}

async fn orders_by_user(
    State(gateway): State<Gateway>,
    user_id: Result<Path<u64>, PathRejection>,
) -> Result<ApiResponse, ApiResponse> {
    let Path(user_id) = user_id?;
    let inner = &gateway.inner;
    Ok(gateway
        .filter(&inner.orders, "Orders service", ORDERS_BY_USER, json!(user_id))
        .await)
}

async fn orders_by_status(
    State(gateway): State<Gateway>,
    Path(status): Path<String>,
) -> ApiResponse {
    let inner = &gateway.inner;
    gateway
        .filter(&inner.orders, "Orders service", ORDERS_BY_STATUS, JsonValue::String(status))
        .await
}

async fn orders_by_category(
    State(gateway): State<Gateway>,
    Path(category): Path<String>,
) -> ApiResponse {
    let inner = &gateway.inner;
    gateway
        .filter(&inner.orders, "Orders service", ORDERS_BY_CATEGORY, JsonValue::String(category))
        .await
}

async fn dashboard(State(gateway): State<Gateway>) -> ApiResponse {
    let inner = &gateway.inner;
    views::dashboard(&inner.name, &inner.dispatcher, &inner.users, &inner.orders).await
}

#[derive(Serialize)]
struct GatewayHealth {
    gateway: &'static str,
    #[serde(flatten)]
    report: HealthReport,
}

async fn health(State(gateway): State<Gateway>) -> Response {
    let inner = &gateway.inner;
    let report = rollup(
        &inner.dispatcher,
        &[inner.users.clone(), inner.orders.clone()],
        inner.health_timeout,
    )
    .await;

    let status = report.status_code();
    (
        status,
        Json(GatewayHealth {
            gateway: "healthy",
            report,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;
    use upstream::errors::UpstreamError;
    use upstream::testutils::FakeTransport;

    const USERS: &str = "http://users-service:5001";
    const ORDERS: &str = "http://orders-service:5002";

    fn config(normalize_empty_filters: bool) -> Config {
        let yaml = format!(
            r#"
listener:
    host: "127.0.0.1"
    port: 8000
users:
    url: "{USERS}"
orders:
    url: "{ORDERS}"
normalize_empty_filters: {normalize_empty_filters}
"#
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    fn app(fake: &Arc<FakeTransport>, normalize_empty_filters: bool) -> Router {
        let client = UpstreamClient::new(fake.clone());
        router(Gateway::new(&config(normalize_empty_filters), client))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, JsonValue) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn ross() -> JsonValue {
        json!({"user": {"id": 1, "name": "Ross", "active": true, "favorite_drink": "latte"}})
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let fake = Arc::new(FakeTransport::new());
        let (status, body) = get(app(&fake, true), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "gateway");
        assert!(body["available_endpoints"]["combined"].is_array());
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_forwards_query_and_status() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            &format!("{USERS}/users"),
            StatusCode::OK,
            json!({"users": [], "total": 0}),
        );
        fake.respond(
            &format!("{ORDERS}/orders/7"),
            StatusCode::NOT_FOUND,
            json!({"error": "Order not found"}),
        );

        let (status, body) = get(app(&fake, true), "/users?active=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
        assert_eq!(body["service"], "gateway");
        assert_eq!(fake.requests()[0].query(), Some("active=true"));

        let (status, body) = get(app(&fake, true), "/orders/7").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Order not found");
    }

    #[tokio::test]
    async fn test_passthrough_unreachable_is_503() {
        let fake = Arc::new(FakeTransport::new());
        let (status, body) = get(app(&fake, true), "/orders").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Orders service unavailable");
    }

    #[tokio::test]
    async fn test_filter_404_normalized_to_empty_list() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            &format!("{ORDERS}/orders/status/lost"),
            StatusCode::NOT_FOUND,
            json!({"error": "No orders found"}),
        );

        let (status, body) = get(app(&fake, true), "/orders/status/lost").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orders"], json!([]));
        assert_eq!(body["total"], 0);
        assert_eq!(body["status"], "lost");
        assert_eq!(body["normalized"], true);

        let (status, body) = get(app(&fake, false), "/orders/status/lost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No orders found");
    }

    #[tokio::test]
    async fn test_filter_by_user_echoes_numeric_id() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            &format!("{ORDERS}/orders/user/7"),
            StatusCode::NOT_FOUND,
            json!({"error": "No orders for user"}),
        );

        let (status, body) = get(app(&fake, true), "/orders/user/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], json!(7));
        assert_eq!(body["normalized"], true);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_json_400() {
        let fake = Arc::new(FakeTransport::new());
        for uri in ["/users/abc", "/users/abc/orders", "/orders/abc", "/orders/user/abc"] {
            let (status, body) = get(app(&fake, true), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "Invalid path parameter", "{uri}");
            assert!(body["message"].is_string(), "{uri}");
        }
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_filter_200_untouched() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            &format!("{USERS}/users/drink/latte"),
            StatusCode::OK,
            json!({"users": [], "favorite_drink": "latte", "total": 0}),
        );

        let (status, body) = get(app(&fake, true), "/users/drink/latte").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("normalized").is_none());
    }

    #[tokio::test]
    async fn test_join_unknown_user_skips_orders() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            &format!("{USERS}/users/99"),
            StatusCode::NOT_FOUND,
            json!({"error": "User not found"}),
        );

        let (status, body) = get(app(&fake, true), "/users/99/orders").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
        assert_eq!(fake.calls(&format!("{ORDERS}/orders/user/99")), 0);
    }

    #[tokio::test]
    async fn test_join_orders_offline_keeps_user() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(&format!("{USERS}/users/1"), StatusCode::OK, ross());
        fake.fail(
            &format!("{ORDERS}/orders/user/1"),
            UpstreamError::Timeout("orders-service".into()),
        );

        let (status, body) = get(app(&fake, true), "/users/1/orders").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "Ross");
        assert_eq!(
            body["orders_summary"],
            json!({
                "total_orders": 0,
                "total_spent": 0.0,
                "orders": [],
                "orders_service": "offline",
            })
        );
    }

    #[tokio::test]
    async fn test_join_sums_price_times_quantity() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(&format!("{USERS}/users/1"), StatusCode::OK, ross());
        fake.respond(
            &format!("{ORDERS}/orders/user/1"),
            StatusCode::OK,
            json!({"orders": [
                {"id": 1, "user_id": 1, "category": "coffee", "status": "ready",
                 "quantity": 2, "price": 4.5},
                {"id": 2, "user_id": 1, "category": "food", "status": "pending",
                 "quantity": 1, "price": 3.25},
            ]}),
        );

        let (status, body) = get(app(&fake, true), "/users/1/orders").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gateway"], "gateway");
        assert_eq!(body["orders_summary"]["total_orders"], 2);
        assert_eq!(body["orders_summary"]["total_spent"], 12.25);
        assert_eq!(body["orders_summary"]["orders_service"], "online");
    }

    #[tokio::test]
    async fn test_dashboard_degrades_when_orders_offline() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            &format!("{USERS}/users"),
            StatusCode::OK,
            json!({"users": [
                {"id": 1, "name": "Ross", "active": true},
                {"id": 2, "name": "Gunther", "active": false},
            ]}),
        );

        let (status, body) = get(app(&fake, true), "/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        let dashboard = &body["dashboard"];
        assert_eq!(dashboard["users"], json!({"total": 2, "active": 1, "inactive": 1}));
        assert_eq!(dashboard["orders"]["total"], 0);
        assert_eq!(dashboard["services_status"]["users_service"], "online");
        assert_eq!(dashboard["services_status"]["orders_service"], "offline");
    }

    #[tokio::test]
    async fn test_health_degraded_is_503() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            &format!("{USERS}/health"),
            StatusCode::OK,
            json!({"status": "healthy"}),
        );

        let (status, body) = get(app(&fake, true), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["gateway"], "healthy");
        assert_eq!(body["overall_status"], "degraded");
        assert_eq!(body["services"]["users-service"]["status"], "healthy");
        assert!(body["services"]["users-service"]["response_time_ms"].is_number());
        assert_eq!(body["services"]["orders-service"]["status"], "unreachable");
        assert!(body["services"]["orders-service"].get("response_time_ms").is_none());
    }

    #[tokio::test]
    async fn test_health_all_up_is_200() {
        let fake = Arc::new(FakeTransport::new());
        for base in [USERS, ORDERS] {
            fake.respond(&format!("{base}/health"), StatusCode::OK, json!({"status": "healthy"}));
        }

        let (status, body) = get(app(&fake, true), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overall_status"], "healthy");
    }
}

//! Parent/dependents join across two upstreams.
//!
//! The parent is fetched first. Dependents are only requested once the parent
//! is known to exist, so a missing parent costs exactly one upstream call.

use crate::aggregator::Availability;
use crate::client::{Call, Reply, UpstreamClient};
use crate::errors::UpstreamError;

/// Dependent records of a joined parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependents<C> {
    pub items: Vec<C>,
    /// Sum of the weight of every item, rounded to cents
    pub total: f64,
    /// `Offline` when the dependents could not be fetched; the empty
    /// `items` then mean "unknown", not "none"
    pub availability: Availability,
}

impl<C> Dependents<C> {
    pub fn collect(items: Vec<C>, weight: impl Fn(&C) -> f64) -> Self {
        let total = items.iter().map(weight).sum::<f64>();
        Self {
            items,
            total: round2(total),
            availability: Availability::Online,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            items: Vec::new(),
            total: 0.0,
            availability: Availability::Offline,
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug)]
pub enum Joined<P, C> {
    Found { primary: P, dependents: Dependents<C> },
    /// The parent upstream answered with a non-success status (typically 404).
    /// Dependents were not requested.
    Rejected(Reply),
}

/// Fetches a parent and its dependents.
///
/// - Parent unreachable or unusable: `Err`, the caller answers 503.
/// - Parent answered non-2xx: [`Joined::Rejected`] without a dependents call.
/// - Dependents unreachable, unusable or answering 5xx: the parent is still
///   returned, with [`Dependents::unavailable`].
/// - Dependents answering 404: some record stores signal an empty filter this
///   way; it is treated as zero dependents.
pub async fn join<P, C, DP, DC, W>(
    client: &UpstreamClient,
    primary: &Call,
    dependents: &Call,
    decode_primary: DP,
    decode_dependents: DC,
    weight: W,
) -> Result<Joined<P, C>, UpstreamError>
where
    DP: FnOnce(&Reply) -> Result<P, UpstreamError>,
    DC: FnOnce(&Reply) -> Result<Vec<C>, UpstreamError>,
    W: Fn(&C) -> f64,
{
    let reply = client.execute(primary).await?;
    if !reply.is_success() {
        return Ok(Joined::Rejected(reply));
    }
    let primary = decode_primary(&reply)?;

    let dependents = match client.execute(dependents).await {
        Ok(reply) if reply.is_success() => match decode_dependents(&reply) {
            Ok(items) => Dependents::collect(items, weight),
            Err(e) => {
                tracing::warn!(error = %e, "dependents payload unusable, returning parent only");
                Dependents::unavailable()
            }
        },
        Ok(reply) if reply.is_not_found() => Dependents::collect(Vec::new(), weight),
        Ok(reply) => {
            tracing::warn!(
                upstream = %reply.upstream,
                status = %reply.status,
                "dependents fetch failed, returning parent only"
            );
            Dependents::unavailable()
        }
        Err(_) => Dependents::unavailable(),
    };

    Ok(Joined::Found {
        primary,
        dependents,
    })
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Upstream;
    use crate::testutils::FakeTransport;
    use http::StatusCode;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    #[derive(Deserialize, Debug)]
    struct User {
        id: u64,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Order {
        price: f64,
        quantity: u32,
    }

    #[derive(Deserialize)]
    struct UserEnvelope {
        user: User,
    }

    #[derive(Deserialize)]
    struct OrdersEnvelope {
        orders: Vec<Order>,
    }

    const USER_URL: &str = "http://users/users/1";
    const ORDERS_URL: &str = "http://orders/orders/user/1";

    fn calls() -> (Call, Call) {
        let users = Upstream::new(
            "users-service",
            Url::parse("http://users").unwrap(),
            Duration::from_secs(1),
        );
        let orders = Upstream::new(
            "orders-service",
            Url::parse("http://orders").unwrap(),
            Duration::from_secs(1),
        );
        (Call::new(&users, "users/1"), Call::new(&orders, "orders/user/1"))
    }

    async fn run(fake: &Arc<FakeTransport>) -> Result<Joined<User, Order>, UpstreamError> {
        let client = UpstreamClient::new(fake.clone());
        let (primary, dependents) = calls();
        join(
            &client,
            &primary,
            &dependents,
            |r| r.decode::<UserEnvelope>().map(|e| e.user),
            |r| r.decode::<OrdersEnvelope>().map(|e| e.orders),
            |o: &Order| o.price * o.quantity as f64,
        )
        .await
    }

    #[tokio::test]
    async fn test_join_found() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(USER_URL, StatusCode::OK, json!({"user": {"id": 1}}));
        fake.respond(
            ORDERS_URL,
            StatusCode::OK,
            json!({"orders": [{"price": 12.5, "quantity": 2}, {"price": 18.0, "quantity": 1}]}),
        );

        let Joined::Found { primary, dependents } = run(&fake).await.unwrap() else {
            panic!("expected a joined view");
        };
        assert_eq!(primary.id, 1);
        assert_eq!(dependents.count(), 2);
        assert_eq!(dependents.total, 43.0);
        assert_eq!(dependents.availability, Availability::Online);
    }

    #[tokio::test]
    async fn test_parent_not_found_skips_dependents() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(USER_URL, StatusCode::NOT_FOUND, json!({"error": "User not found"}));
        fake.respond(ORDERS_URL, StatusCode::OK, json!({"orders": []}));

        let joined = run(&fake).await.unwrap();

        assert!(matches!(joined, Joined::Rejected(ref r) if r.is_not_found()));
        assert_eq!(fake.calls(USER_URL), 1);
        assert_eq!(fake.calls(ORDERS_URL), 0);
    }

    #[tokio::test]
    async fn test_dependents_failure_degrades() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(USER_URL, StatusCode::OK, json!({"user": {"id": 1}}));
        fake.fail(ORDERS_URL, UpstreamError::Timeout("orders-service".into()));

        let Joined::Found { primary, dependents } = run(&fake).await.unwrap() else {
            panic!("expected a joined view");
        };
        assert_eq!(primary.id, 1);
        assert_eq!(dependents, Dependents::unavailable());
        assert_eq!(dependents.count(), 0);
        assert_eq!(dependents.total, 0.0);
    }

    #[tokio::test]
    async fn test_dependents_not_found_is_empty() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(USER_URL, StatusCode::OK, json!({"user": {"id": 1}}));
        fake.respond(ORDERS_URL, StatusCode::NOT_FOUND, json!({"error": "No orders"}));

        let Joined::Found { dependents, .. } = run(&fake).await.unwrap() else {
            panic!("expected a joined view");
        };
        assert_eq!(dependents.count(), 0);
        assert_eq!(dependents.availability, Availability::Online);
    }

    #[tokio::test]
    async fn test_parent_unreachable() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(ORDERS_URL, StatusCode::OK, json!({"orders": []}));

        let result = run(&fake).await;

        assert!(matches!(result, Err(UpstreamError::Connect(..))));
        assert_eq!(fake.calls(ORDERS_URL), 0);
    }

    #[tokio::test]
    async fn test_parent_missing_required_field() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(USER_URL, StatusCode::OK, json!({"service": "users-service"}));

        let result = run(&fake).await;

        assert!(matches!(result, Err(UpstreamError::InvalidPayload(..))));
    }
}

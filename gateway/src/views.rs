//! Cross-service views built by the gateway.

use crate::models::{Order, OrdersEnvelope, User, UserEnvelope, UsersEnvelope};
use indexmap::IndexMap;
use serde::Serialize;
use upstream::aggregator::{
    ApiResponse, Availability, Composite, best_effort, composite, passthrough_reply,
};
use upstream::client::{Call, Upstream};
use upstream::dispatcher::Dispatcher;
use upstream::join::{Dependents, Joined, join, round2};

#[derive(Debug, Serialize)]
pub struct UserWithOrders {
    pub gateway: String,
    pub user: User,
    pub orders_summary: OrdersSummary,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct OrdersSummary {
    pub total_orders: usize,
    pub total_spent: f64,
    pub orders: Vec<Order>,
    /// `offline` means the orders could not be fetched, not that there are none
    pub orders_service: Availability,
}

impl From<Dependents<Order>> for OrdersSummary {
    fn from(dependents: Dependents<Order>) -> Self {
        Self {
            total_orders: dependents.count(),
            total_spent: dependents.total,
            orders: dependents.items,
            orders_service: dependents.availability,
        }
    }
}

/// `GET /users/{id}/orders`
pub async fn user_with_orders(
    gateway_name: &str,
    dispatcher: &Dispatcher,
    users: &Upstream,
    orders: &Upstream,
    user_id: u64,
) -> ApiResponse {
    let joined = join(
        dispatcher.client(),
        &Call::new(users, format!("users/{user_id}")),
        &Call::new(orders, format!("orders/user/{user_id}")),
        |reply| reply.decode::<UserEnvelope>().map(|envelope| envelope.user),
        |reply| reply.decode::<OrdersEnvelope>().map(|envelope| envelope.orders),
        Order::total,
    )
    .await;

    match joined {
        Ok(Joined::Found {
            primary,
            dependents,
        }) => {
            if dependents.availability == Availability::Offline {
                tracing::warn!(user_id, "returning user without orders");
            }
            ApiResponse::ok_json(&UserWithOrders {
                gateway: gateway_name.to_string(),
                user: primary,
                orders_summary: dependents.into(),
            })
        }
        Ok(Joined::Rejected(reply)) if reply.is_not_found() => {
            ApiResponse::not_found("User not found")
        }
        Ok(Joined::Rejected(reply)) => passthrough_reply(&reply, "Users service"),
        Err(e) => ApiResponse::unavailable("Service", &e),
    }
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub gateway: String,
    pub dashboard: DashboardBody,
}

#[derive(Debug, Serialize)]
pub struct DashboardBody {
    pub users: UserStats,
    pub orders: OrderStats,
    pub services_status: ServicesStatus,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UserStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct OrderStats {
    pub total: usize,
    pub by_status: IndexMap<String, usize>,
    pub by_category: IndexMap<String, usize>,
    pub total_revenue: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ServicesStatus {
    pub users_service: Availability,
    pub orders_service: Availability,
}

impl UserStats {
    pub fn from_users(users: &[User]) -> Self {
        let active = users.iter().filter(|u| u.active).count();
        Self {
            total: users.len(),
            active,
            inactive: users.len() - active,
        }
    }
}

impl OrderStats {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut by_status = IndexMap::new();
        let mut by_category = IndexMap::new();
        for order in orders {
            *by_status.entry(order.status.clone()).or_insert(0) += 1;
            *by_category.entry(order.category.clone()).or_insert(0) += 1;
        }

        Self {
            total: orders.len(),
            by_status,
            by_category,
            total_revenue: round2(orders.iter().map(Order::total).sum()),
        }
    }
}

/// `GET /dashboard`
///
/// Both lists are optional: a dependency that cannot be read contributes zero
/// counts and is flagged `offline`. The response is always 200.
pub async fn dashboard(
    gateway_name: &str,
    dispatcher: &Dispatcher,
    users: &Upstream,
    orders: &Upstream,
) -> ApiResponse {
    let outcomes = dispatcher
        .dispatch(vec![Call::new(users, "users"), Call::new(orders, "orders")])
        .await;

    match composite(&outcomes) {
        Composite::Full => {}
        Composite::Degraded => tracing::warn!("dashboard built from partial data"),
        Composite::Unavailable => tracing::warn!("dashboard built with every dependency offline"),
    }

    let (user_list, users_service) = best_effort::<UsersEnvelope>(&outcomes[0]);
    let (order_list, orders_service) = best_effort::<OrdersEnvelope>(&outcomes[1]);

    ApiResponse::ok_json(&Dashboard {
        gateway: gateway_name.to_string(),
        dashboard: DashboardBody {
            users: UserStats::from_users(&user_list.users),
            orders: OrderStats::from_orders(&order_list.orders),
            services_status: ServicesStatus {
                users_service,
                orders_service,
            },
        },
    })
}

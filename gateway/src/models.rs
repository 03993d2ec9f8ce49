//! Typed records of the users and orders stores.
//!
//! Only the fields the gateway computes with are required. Everything else is
//! carried through untouched in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub active: bool,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub category: String,
    pub status: String,
    pub quantity: u32,
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Order {
    pub fn total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// `GET /users/{id}`
#[derive(Debug, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

/// `GET /users`
#[derive(Debug, Default, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<User>,
}

/// `GET /orders` and every orders filter
#[derive(Debug, Default, Deserialize)]
pub struct OrdersEnvelope {
    pub orders: Vec<Order>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_roundtrip_keeps_extra_fields() {
        let raw = json!({
            "id": 1,
            "user_id": 1,
            "user_name": "Ana Clara Gomes",
            "product": "Cappuccino Grande",
            "category": "Bebida Quente",
            "quantity": 2,
            "price": 12.50,
            "status": "delivered",
            "order_date": "2024-11-28 08:30",
        });

        let order: Order = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(order.total(), 25.0);
        assert_eq!(order.extra["product"], "Cappuccino Grande");
        assert_eq!(serde_json::to_value(&order).unwrap(), raw);
    }

    #[test]
    fn test_user_requires_active() {
        let raw = json!({"id": 1, "name": "Ana"});
        assert!(serde_json::from_value::<User>(raw).is_err());
    }
}

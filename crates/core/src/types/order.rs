//! Order types: the customer-facing order record, checkout lines, and the
//! push-topic status event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;

/// A customer order as returned by `GET /customer/my/orders`.
///
/// Identity key is `id`; older backend deployments emit `_id`, which the
/// serde alias accepts transparently. `status` defaults to `Placed` for
/// records written before status tracking existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub count: u32,
    pub price: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Line total (unit price times quantity).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.count)
    }
}

/// A single checkout line sent to `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub count: u32,
}

/// A server-pushed status change on the order events topic.
///
/// Push events carry only identity and the new status; they never create
/// orders on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusEvent {
    pub order_id: String,
    pub status: OrderStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn test_order_deserializes_camel_case() {
        let json = r#"{
            "id": "o1",
            "productId": "p1",
            "name": "Mechanical Keyboard",
            "count": 2,
            "price": 149.5,
            "status": "SHIPPED",
            "createdAt": 1735689600000
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, "o1");
        assert_eq!(order.product_id, "p1");
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.created_at.timestamp_millis(), 1_735_689_600_000);
    }

    #[test]
    fn test_order_accepts_underscore_id_alias() {
        let json = r#"{
            "_id": "legacy-42",
            "productId": "p9",
            "name": "Desk Lamp",
            "count": 1,
            "price": 20.0,
            "createdAt": 0
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, "legacy-42");
        // Missing status falls back to the initial state.
        assert_eq!(order.status, OrderStatus::Placed);
    }

    #[test]
    fn test_order_total() {
        let order = Order {
            id: "o1".to_string(),
            product_id: "p1".to_string(),
            name: "Mug".to_string(),
            count: 3,
            price: Decimal::from_f64(9.99).unwrap(),
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        };
        assert_eq!(order.total(), Decimal::from_f64(29.97).unwrap());
    }

    #[test]
    fn test_status_event_wire_format() {
        let event: OrderStatusEvent =
            serde_json::from_str(r#"{"orderId":"o7","status":"DELIVERED"}"#).unwrap();
        assert_eq!(event.order_id, "o7");
        assert_eq!(event.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_order_item_serializes_camel_case() {
        let item = OrderItem {
            product_id: "p1".to_string(),
            name: "Mug".to_string(),
            price: Decimal::from(5),
            count: 2,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("productId").is_some());
        assert!(json.get("product_id").is_none());
    }
}

//! 订单与订单事件

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("customer id must not be empty")]
    MissingCustomer,
    #[error("order must contain at least one item")]
    EmptyItems,
    #[error("invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: String },
    #[error("invalid unit price for product {product_id}")]
    InvalidPrice { product_id: String },
    #[error("failed to publish order event: {0}")]
    EventPublish(String),
}

/// 订单条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 已接收，等待后续处理
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// 订单聚合
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// 校验请求并构建一个新订单
    pub fn new(customer_id: String, items: Vec<OrderItem>) -> Result<Self, OrderError> {
        if customer_id.trim().is_empty() {
            return Err(OrderError::MissingCustomer);
        }
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                });
            }
            if item.unit_price < 0.0 {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id.clone(),
                });
            }
        }

        let total_amount = items
            .iter()
            .map(|item| item.unit_price * f64::from(item.quantity))
            .sum();

        Ok(Self {
            order_id: Uuid::new_v4().to_string(),
            customer_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        })
    }
}

/// 订单创建事件，序列化为 JSON 后发布到消息代理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub event_type: String,
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderCreatedEvent {
    fn from(order: &Order) -> Self {
        Self {
            event_type: "order.created".to_string(),
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            items: order.items.clone(),
            total_amount: order.total_amount,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, quantity: u32, unit_price: f64) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn computes_total_over_all_items() {
        let order = Order::new(
            "customer-1".to_string(),
            vec![item("p-1", 2, 10.5), item("p-2", 1, 4.0)],
        )
        .unwrap();

        assert_eq!(order.total_amount, 25.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.order_id.is_empty());
    }

    #[test]
    fn rejects_empty_customer_and_empty_items() {
        assert!(matches!(
            Order::new("  ".to_string(), vec![item("p-1", 1, 1.0)]),
            Err(OrderError::MissingCustomer)
        ));
        assert!(matches!(
            Order::new("customer-1".to_string(), vec![]),
            Err(OrderError::EmptyItems)
        ));
    }

    #[test]
    fn rejects_zero_quantity_and_negative_price() {
        assert!(matches!(
            Order::new("customer-1".to_string(), vec![item("p-1", 0, 1.0)]),
            Err(OrderError::InvalidQuantity { product_id }) if product_id == "p-1"
        ));
        assert!(matches!(
            Order::new("customer-1".to_string(), vec![item("p-2", 1, -0.5)]),
            Err(OrderError::InvalidPrice { product_id }) if product_id == "p-2"
        ));
    }

    #[test]
    fn created_event_mirrors_the_order() {
        let order = Order::new("customer-1".to_string(), vec![item("p-1", 3, 2.0)]).unwrap();
        let event = OrderCreatedEvent::from(&order);

        assert_eq!(event.event_type, "order.created");
        assert_eq!(event.order_id, order.order_id);
        assert_eq!(event.total_amount, 6.0);

        // 事件负载是稳定的 JSON
        let payload = serde_json::to_value(&event).unwrap();
        assert_eq!(payload["event_type"], "order.created");
        assert_eq!(payload["items"][0]["product_id"], "p-1");
    }
}

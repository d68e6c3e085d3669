//! 订单应用服务

use std::sync::Arc;

use tracing::info;

use crate::domain::{Order, OrderCreatedEvent, OrderError, OrderEventPublisher, OrderItem};

/// 订单应用服务：校验请求、构建订单并发布订单事件
pub struct OrderApplication {
    publisher: Arc<dyn OrderEventPublisher>,
}

impl OrderApplication {
    pub fn new(publisher: Arc<dyn OrderEventPublisher>) -> Self {
        Self { publisher }
    }

    pub async fn create_order(
        &self,
        customer_id: String,
        items: Vec<OrderItem>,
    ) -> Result<Order, OrderError> {
        let order = Order::new(customer_id, items)?;

        let event = OrderCreatedEvent::from(&order);
        self.publisher
            .publish_created(&event)
            .await
            .map_err(|err| OrderError::EventPublish(err.to_string()))?;

        info!(
            order_id = %order.order_id,
            customer_id = %order.customer_id,
            total_amount = order.total_amount,
            "order created"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<OrderCreatedEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl OrderEventPublisher for RecordingPublisher {
        async fn publish_created(&self, event: &OrderCreatedEvent) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("broker unavailable");
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn items() -> Vec<OrderItem> {
        vec![OrderItem {
            product_id: "p-1".to_string(),
            quantity: 2,
            unit_price: 3.5,
        }]
    }

    #[tokio::test]
    async fn publishes_created_event_with_order_id() {
        let publisher = Arc::new(RecordingPublisher::default());
        let application = OrderApplication::new(publisher.clone());

        let order = application
            .create_order("customer-1".to_string(), items())
            .await
            .unwrap();

        let events = publisher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id, order.order_id);
        assert_eq!(events[0].total_amount, 7.0);
    }

    #[tokio::test]
    async fn publish_failure_surfaces_as_event_publish_error() {
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..Default::default()
        });
        let application = OrderApplication::new(publisher);

        let err = application
            .create_order("customer-1".to_string(), items())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::EventPublish(_)));
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_publishing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let application = OrderApplication::new(publisher.clone());

        let err = application
            .create_order("customer-1".to_string(), vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::EmptyItems));
        assert!(publisher.events.lock().unwrap().is_empty());
    }
}

//! 基于消息代理的订单事件发布器

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use oms_core::broker::{Broker, BrokerTopology};

use crate::domain::{OrderCreatedEvent, OrderEventPublisher};

/// 把订单事件以 JSON 负载发布到配置的交换机/路由键
pub struct BrokerEventPublisher {
    broker: Arc<dyn Broker>,
    topology: BrokerTopology,
}

impl BrokerEventPublisher {
    pub fn new(broker: Arc<dyn Broker>, topology: BrokerTopology) -> Self {
        Self { broker, topology }
    }
}

#[async_trait]
impl OrderEventPublisher for BrokerEventPublisher {
    async fn publish_created(&self, event: &OrderCreatedEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(event)?;
        self.broker
            .publish(&self.topology.exchange, &self.topology.routing_key, &payload)
            .await?;

        debug!(
            order_id = %event.order_id,
            exchange = %self.topology.exchange,
            routing_key = %self.topology.routing_key,
            "order event published"
        );
        Ok(())
    }
}

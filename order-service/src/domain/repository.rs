//! 领域层对外依赖的抽象

use async_trait::async_trait;

use super::order::OrderCreatedEvent;

/// 订单事件发布器
#[async_trait]
pub trait OrderEventPublisher: Send + Sync {
    /// 发布订单创建事件
    async fn publish_created(&self, event: &OrderCreatedEvent) -> anyhow::Result<()>;
}

//! 消息代理客户端模块
//!
//! 定义代理拓扑建立与事件发布的抽象，AMQP 实现见 [`amqp`]。

pub mod amqp;

use async_trait::async_trait;

use crate::config::BrokerConfig;
use crate::error::BrokerError;

pub use amqp::AmqpBroker;

/// 消息代理拓扑：服务发布/消费消息前需要建立的命名构件
#[derive(Debug, Clone)]
pub struct BrokerTopology {
    /// 队列名称
    pub queue: String,
    /// 交换机名称
    pub exchange: String,
    /// 路由键
    pub routing_key: String,
}

impl From<&BrokerConfig> for BrokerTopology {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            queue: config.queue.clone(),
            exchange: config.exchange.clone(),
            routing_key: config.routing_key.clone(),
        }
    }
}

/// 消息代理抽象
#[async_trait]
pub trait Broker: Send + Sync {
    /// 建立代理拓扑（队列、交换机、绑定）
    ///
    /// 失败由调用方决定策略；启动器将其视为非致命步骤，
    /// 失败后服务以降级模式继续运行。
    async fn provision(&self, topology: &BrokerTopology) -> Result<(), BrokerError>;

    /// 向交换机发布一条消息
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<(), BrokerError>;
}

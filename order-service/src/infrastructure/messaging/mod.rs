//! 消息发布基础设施

pub mod broker_publisher;

pub use broker_publisher::BrokerEventPublisher;

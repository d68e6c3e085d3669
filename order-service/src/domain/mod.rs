//! 订单领域模型

pub mod order;
pub mod repository;

pub use order::{Order, OrderCreatedEvent, OrderError, OrderItem, OrderStatus};
pub use repository::OrderEventPublisher;

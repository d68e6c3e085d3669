//! 订单服务
//!
//! 负责接收订单创建请求并把订单事件发布到消息代理。
//! 启动器按固定顺序完成注册中心注册、心跳任务、监听器绑定
//! 与代理拓扑建立，并管理停机序列。

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod service;

pub use service::bootstrap::Bootstrap;

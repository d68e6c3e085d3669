//! OMS 公共库
//!
//! 提供统一的配置加载、遥测初始化、服务注册发现与消息代理客户端

pub mod broker;
pub mod config;
pub mod discovery;
pub mod error;
pub mod tracing;

pub use broker::{AmqpBroker, Broker, BrokerTopology};
pub use config::{
    AppConfig, BrokerConfig, LoggingConfig, RegistryConfig, ServerConfig, ServiceConfig,
    TelemetryConfig, app_config, load_config,
};
pub use discovery::{
    HEALTH_REPORT_INTERVAL, HeartbeatHandle, HeartbeatReporter, RegistryBackend, ServiceInstance,
    create_registry,
};
pub use error::{BrokerError, ConfigError, DiscoveryError, TelemetryError};
pub use crate::tracing::{TelemetryGuard, init_telemetry};

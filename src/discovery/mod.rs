//! 服务注册发现模块
//!
//! 定义注册中心后端抽象（etcd / Consul），以及从配置构建后端实例的工厂。
//! 心跳上报任务见 [`heartbeat`]。

pub mod consul;
pub mod etcd;
pub mod heartbeat;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::error::DiscoveryError;

pub use consul::ConsulRegistry;
pub use etcd::EtcdRegistry;
pub use heartbeat::{HEALTH_REPORT_INTERVAL, HeartbeatHandle, HeartbeatReporter};

/// 服务实例身份
///
/// 进程启动时生成一次，进程生命周期内不可变；
/// 是所有注册中心调用的键。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// 服务名称（服务类型）
    pub service_name: String,
    /// 实例 ID，格式 `{service_name}-{uuid_short}`
    pub instance_id: String,
    /// 对外公布的地址
    pub address: String,
    /// 对外公布的端口
    pub port: u16,
}

impl ServiceInstance {
    /// 生成一个新的实例身份
    pub fn generate(service_name: &str, address: &str, port: u16) -> Self {
        let instance_id = format!("{}-{}", service_name, &Uuid::new_v4().to_string()[..8]);
        Self {
            service_name: service_name.to_string(),
            instance_id,
            address: address.to_string(),
            port,
        }
    }

    /// 实例的网络端点
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// 注册中心后端抽象
///
/// 所有操作返回显式的 `Result`，由调用方决定失败策略：
/// 注册失败是致命错误，心跳失败只记录，注销是尽力而为。
#[async_trait]
pub trait RegistryBackend: Send + Sync + std::fmt::Debug {
    /// 注册服务实例
    async fn register(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError>;

    /// 上报实例存活（心跳）
    async fn health_check(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError>;

    /// 注销服务实例
    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError>;
}

/// 从注册中心配置构建后端实例
pub async fn create_registry(
    config: &RegistryConfig,
) -> Result<Arc<dyn RegistryBackend>, DiscoveryError> {
    match config.registry_type.to_lowercase().as_str() {
        "etcd" => {
            let registry = EtcdRegistry::connect(&config.endpoints, &config.namespace).await?;
            Ok(Arc::new(registry))
        }
        "consul" => {
            let endpoint = config
                .endpoints
                .first()
                .cloned()
                .unwrap_or_else(|| "http://localhost:8500".to_string());
            Ok(Arc::new(ConsulRegistry::new(&endpoint)))
        }
        other => Err(DiscoveryError::UnsupportedBackend(other.to_string())),
    }
}

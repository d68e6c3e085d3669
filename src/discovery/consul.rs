//! Consul 注册中心后端
//!
//! 通过 Consul Agent HTTP API 注册带 TTL 检查的服务实例；
//! 心跳通过 `check/pass` 续期，TTL 过期后实例进入 critical 状态
//! 并在宽限期后被自动注销。

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{RegistryBackend, ServiceInstance};
use crate::error::DiscoveryError;

/// TTL 检查的有效期；心跳间隔为 1 秒，留出多个周期的容错窗口
const CHECK_TTL: &str = "10s";
/// 实例进入 critical 状态后被 Consul 自动注销的宽限期
const DEREGISTER_AFTER: &str = "1m";

#[derive(Debug)]
pub struct ConsulRegistry {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct ServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Check")]
    check: AgentCheck<'a>,
}

#[derive(Serialize)]
struct AgentCheck<'a> {
    #[serde(rename = "CheckID")]
    check_id: &'a str,
    #[serde(rename = "TTL")]
    ttl: &'static str,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    deregister_after: &'static str,
}

impl ConsulRegistry {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

/// Consul 为服务实例生成的默认检查 ID
fn check_id(instance: &ServiceInstance) -> String {
    format!("service:{}", instance.instance_id)
}

#[async_trait]
impl RegistryBackend for ConsulRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError> {
        let check_id = check_id(instance);
        let registration = ServiceRegistration {
            id: &instance.instance_id,
            name: &instance.service_name,
            address: &instance.address,
            port: instance.port,
            check: AgentCheck {
                check_id: &check_id,
                ttl: CHECK_TTL,
                deregister_after: DEREGISTER_AFTER,
            },
        };

        self.http
            .put(format!("{}/v1/agent/service/register", self.base_url))
            .json(&registration)
            .send()
            .await?
            .error_for_status()?;

        debug!(instance_id = %instance.instance_id, "instance registered in consul");
        Ok(())
    }

    async fn health_check(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError> {
        self.http
            .put(format!(
                "{}/v1/agent/check/pass/{}",
                self.base_url,
                check_id(instance)
            ))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError> {
        self.http
            .put(format!(
                "{}/v1/agent/service/deregister/{}",
                self.base_url, instance.instance_id
            ))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_id_follows_consul_convention() {
        let instance = ServiceInstance {
            service_name: "order-service".to_string(),
            instance_id: "order-service-a1b2c3d4".to_string(),
            address: "10.0.0.7".to_string(),
            port: 50051,
        };
        assert_eq!(check_id(&instance), "service:order-service-a1b2c3d4");
    }

    #[test]
    fn registration_payload_uses_agent_api_field_names() {
        let instance = ServiceInstance {
            service_name: "order-service".to_string(),
            instance_id: "order-service-a1b2c3d4".to_string(),
            address: "10.0.0.7".to_string(),
            port: 50051,
        };
        let check_id = check_id(&instance);
        let registration = ServiceRegistration {
            id: &instance.instance_id,
            name: &instance.service_name,
            address: &instance.address,
            port: instance.port,
            check: AgentCheck {
                check_id: &check_id,
                ttl: CHECK_TTL,
                deregister_after: DEREGISTER_AFTER,
            },
        };

        let payload = serde_json::to_value(&registration).unwrap();
        assert_eq!(payload["ID"], "order-service-a1b2c3d4");
        assert_eq!(payload["Name"], "order-service");
        assert_eq!(payload["Port"], 50051);
        assert_eq!(payload["Check"]["TTL"], "10s");
        assert_eq!(payload["Check"]["CheckID"], "service:order-service-a1b2c3d4");
    }
}

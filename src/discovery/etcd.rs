//! etcd 注册中心后端
//!
//! 注册时申请一个带 TTL 的租约并把实例信息写入
//! `{namespace}/services/{service_name}/{instance_id}`；
//! 心跳通过续租实现，注销时删除键并吊销租约。

use async_trait::async_trait;
use etcd_client::{Client, PutOptions};
use tokio::sync::Mutex;
use tracing::debug;

use super::{RegistryBackend, ServiceInstance};
use crate::error::DiscoveryError;

/// 租约 TTL（秒）；心跳间隔为 1 秒，留出多个周期的容错窗口
const LEASE_TTL_SECS: i64 = 10;

pub struct EtcdRegistry {
    client: Client,
    namespace: String,
    /// 注册成功后持有的租约 ID
    lease_id: Mutex<Option<i64>>,
}

impl std::fmt::Debug for EtcdRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdRegistry")
            .field("namespace", &self.namespace)
            .field("lease_id", &self.lease_id)
            .finish_non_exhaustive()
    }
}

impl EtcdRegistry {
    /// 连接 etcd 集群
    pub async fn connect(endpoints: &[String], namespace: &str) -> Result<Self, DiscoveryError> {
        let client = Client::connect(endpoints, None).await?;
        Ok(Self {
            client,
            namespace: namespace.trim_end_matches('/').to_string(),
            lease_id: Mutex::new(None),
        })
    }

    fn key(&self, instance: &ServiceInstance) -> String {
        registry_key(&self.namespace, instance)
    }
}

fn registry_key(namespace: &str, instance: &ServiceInstance) -> String {
    format!(
        "{}/services/{}/{}",
        namespace, instance.service_name, instance.instance_id
    )
}

#[async_trait]
impl RegistryBackend for EtcdRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError> {
        let payload = serde_json::to_string(instance)?;
        let mut client = self.client.clone();

        let lease = client.lease_grant(LEASE_TTL_SECS, None).await?;
        client
            .put(
                self.key(instance),
                payload,
                Some(PutOptions::new().with_lease(lease.id())),
            )
            .await?;

        *self.lease_id.lock().await = Some(lease.id());
        debug!(key = %self.key(instance), lease_id = lease.id(), "instance registered in etcd");
        Ok(())
    }

    async fn health_check(&self, _instance: &ServiceInstance) -> Result<(), DiscoveryError> {
        let lease_id = (*self.lease_id.lock().await).ok_or(DiscoveryError::NotRegistered)?;

        let mut client = self.client.clone();
        let (mut keeper, mut responses) = client.lease_keep_alive(lease_id).await?;
        keeper.keep_alive().await?;
        responses.message().await?;
        Ok(())
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), DiscoveryError> {
        let mut client = self.client.clone();
        client.delete(self.key(instance), None).await?;

        if let Some(lease_id) = self.lease_id.lock().await.take() {
            client.lease_revoke(lease_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> ServiceInstance {
        ServiceInstance {
            service_name: "order-service".to_string(),
            instance_id: "order-service-a1b2c3d4".to_string(),
            address: "10.0.0.7".to_string(),
            port: 50051,
        }
    }

    #[test]
    fn key_includes_namespace_service_and_instance() {
        assert_eq!(
            registry_key("/oms", &instance()),
            "/oms/services/order-service/order-service-a1b2c3d4"
        );
        // 未配置命名空间时不带前缀
        assert_eq!(
            registry_key("", &instance()),
            "/services/order-service/order-service-a1b2c3d4"
        );
    }

    #[test]
    fn instance_payload_round_trips_as_json() {
        let payload = serde_json::to_string(&instance()).unwrap();
        let decoded: ServiceInstance = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded.instance_id, instance().instance_id);
        assert_eq!(decoded.port, 50051);
    }
}

//! 心跳上报任务
//!
//! 注册成功后在独立任务中按固定节奏向注册中心上报实例存活。
//! 单次上报失败只记录错误，绝不终止任务或影响主服务路径；
//! 任务只通过取消令牌停止，由启动器在停机序列的第一步取消。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::{RegistryBackend, ServiceInstance};

/// 心跳上报间隔，固定 1 秒，不做退避或抖动
pub const HEALTH_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// 心跳上报任务
pub struct HeartbeatReporter {
    backend: Arc<dyn RegistryBackend>,
    instance: ServiceInstance,
    token: CancellationToken,
}

/// 运行中的心跳任务句柄
pub struct HeartbeatHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatReporter {
    /// 启动心跳任务
    ///
    /// 只能在实例注册成功之后调用；令牌与实例身份一同创建，
    /// 取消令牌是停止任务的唯一途径。
    pub fn spawn(
        backend: Arc<dyn RegistryBackend>,
        instance: ServiceInstance,
        token: CancellationToken,
    ) -> HeartbeatHandle {
        let reporter = Self {
            backend,
            instance,
            token: token.clone(),
        };
        let task = tokio::spawn(reporter.run());
        HeartbeatHandle { token, task }
    }

    async fn run(self) {
        loop {
            if let Err(err) = self.backend.health_check(&self.instance).await {
                error!(
                    instance_id = %self.instance.instance_id,
                    error = %err,
                    "health report failed"
                );
            }

            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(HEALTH_REPORT_INTERVAL) => {}
            }
        }
        debug!(instance_id = %self.instance.instance_id, "heartbeat reporter stopped");
    }
}

impl HeartbeatHandle {
    /// 取消心跳任务并等待其退出
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }

    /// 任务是否已经退出
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::DiscoveryError;

    #[derive(Debug)]
    struct RecordingBackend {
        health_calls: AtomicUsize,
        fail: bool,
    }

    impl RecordingBackend {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                health_calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn health_calls(&self) -> usize {
            self.health_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RegistryBackend for RecordingBackend {
        async fn register(&self, _instance: &ServiceInstance) -> Result<(), DiscoveryError> {
            Ok(())
        }

        async fn health_check(&self, _instance: &ServiceInstance) -> Result<(), DiscoveryError> {
            self.health_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DiscoveryError::Backend("registry unreachable".to_string()))
            } else {
                Ok(())
            }
        }

        async fn deregister(&self, _instance: &ServiceInstance) -> Result<(), DiscoveryError> {
            Ok(())
        }
    }

    fn instance() -> ServiceInstance {
        ServiceInstance::generate("order-service", "127.0.0.1", 50051)
    }

    #[tokio::test(start_paused = true)]
    async fn reports_on_a_fixed_cadence() {
        let backend = RecordingBackend::new(false);
        let handle =
            HeartbeatReporter::spawn(backend.clone(), instance(), CancellationToken::new());

        // 首次上报在启动时立即发生，之后每 1 秒一次
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(backend.health_calls(), 6);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_failures_never_stop_the_task() {
        let backend = RecordingBackend::new(true);
        let handle =
            HeartbeatReporter::spawn(backend.clone(), instance(), CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(4500)).await;
        // K 次失败后仍按节奏发出第 K+1 次调用
        assert_eq!(backend.health_calls(), 5);
        assert!(!handle.is_finished());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(backend.health_calls(), 7);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_reporting() {
        let backend = RecordingBackend::new(false);
        let token = CancellationToken::new();
        let handle = HeartbeatReporter::spawn(backend.clone(), instance(), token);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let calls_before = backend.health_calls();
        handle.shutdown().await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(backend.health_calls(), calls_before);
    }
}

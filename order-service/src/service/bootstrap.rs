//! 应用启动器 - 按固定顺序驱动启动步骤并管理停机序列
//!
//! 启动顺序：注册实例 → 启动心跳任务 → 绑定监听器 →
//! 建立代理拓扑（非致命）→ 组装请求服务 → 进入服务循环。
//! 停机顺序：取消心跳 → 注销实例 → 停止服务器并关闭监听器 → 刷新遥测。
//! 无论以正常停止还是致命错误退出，已获取的资源都只释放一次，
//! 单个释放动作失败不阻止后续动作。

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info, warn};

use oms_core::broker::{AmqpBroker, Broker, BrokerTopology};
use oms_core::config::AppConfig;
use oms_core::discovery::{
    HeartbeatHandle, HeartbeatReporter, RegistryBackend, ServiceInstance, create_registry,
};
use oms_core::tracing::TelemetryGuard;
use oms_proto::order::order_service_server::OrderServiceServer;

use crate::application::OrderApplication;
use crate::infrastructure::messaging::BrokerEventPublisher;
use crate::interface::grpc::OrderGrpcHandler;

/// 启动过程中获取的资源台账
///
/// 字段为 `Some` 当且仅当对应的获取步骤成功返回；
/// 由停机序列一次性耗尽。
#[derive(Default)]
struct BootstrapState {
    registration: Option<ServiceInstance>,
    heartbeat: Option<HeartbeatHandle>,
    server: Option<ServerHandle>,
}

/// 运行中的 gRPC 服务器句柄
struct ServerHandle {
    stop: CancellationToken,
    task: JoinHandle<Result<(), tonic::transport::Error>>,
}

/// 应用启动器
pub struct Bootstrap {
    config: &'static AppConfig,
    telemetry: TelemetryGuard,
    registry: Option<Arc<dyn RegistryBackend>>,
    broker: Arc<dyn Broker>,
}

impl Bootstrap {
    /// 从配置构建真实协作方
    ///
    /// 注册中心客户端构建失败是致命错误；消息代理此处只创建客户端，
    /// 连接推迟到拓扑建立步骤，与该步骤共用非致命策略。
    pub async fn from_config(
        config: &'static AppConfig,
        telemetry: TelemetryGuard,
    ) -> Result<Self> {
        let registry = match &config.registry {
            Some(registry_config) => Some(
                create_registry(registry_config)
                    .await
                    .context("failed to create service registry client")?,
            ),
            None => {
                info!("service registry not configured, skipping registration");
                None
            }
        };
        let broker: Arc<dyn Broker> = Arc::new(AmqpBroker::new(&config.broker.url));
        Ok(Self::new(config, telemetry, registry, broker))
    }

    /// 使用给定协作方构建启动器
    pub fn new(
        config: &'static AppConfig,
        telemetry: TelemetryGuard,
        registry: Option<Arc<dyn RegistryBackend>>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        Self {
            config,
            telemetry,
            registry,
            broker,
        }
    }

    /// 执行启动序列并服务请求，直到 `shutdown` 触发或发生致命错误
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let mut state = BootstrapState::default();
        let result = self.run_steps(&mut state, &shutdown).await;
        self.teardown(state).await;
        result
    }

    async fn run_steps(
        &self,
        state: &mut BootstrapState,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let config = self.config;

        // 实例身份与心跳取消令牌一同创建，进程生命周期内不可变
        let instance = ServiceInstance::generate(
            &config.service.name,
            config.server.advertise_addr(),
            config.server.port,
        );
        let heartbeat_token = CancellationToken::new();

        // 注册实例（致命）；心跳任务只为注册成功的身份启动
        if let Some(registry) = &self.registry {
            registry
                .register(&instance)
                .await
                .context("failed to register service instance")?;
            info!(
                instance_id = %instance.instance_id,
                endpoint = %instance.endpoint(),
                "✅ service instance registered"
            );
            state.registration = Some(instance.clone());

            state.heartbeat = Some(HeartbeatReporter::spawn(
                registry.clone(),
                instance.clone(),
                heartbeat_token,
            ));
        }

        // 绑定监听器（致命）
        let bind_addr = config.server.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind listener on {bind_addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("failed to read listener address")?;

        // 建立消息拓扑（非致命）：代理故障不阻塞请求服务
        let topology = BrokerTopology::from(&config.broker);
        if let Err(err) = self.broker.provision(&topology).await {
            error!(
                error = %err,
                "failed to provision broker topology, continuing in degraded mode"
            );
        }

        // 组装请求服务并启动 gRPC 服务器
        let publisher = Arc::new(BrokerEventPublisher::new(self.broker.clone(), topology));
        let application = Arc::new(OrderApplication::new(publisher));
        let handler = OrderGrpcHandler::new(application);

        let stop = CancellationToken::new();
        let serve_stop = stop.clone();
        let incoming = TcpListenerStream::new(listener);
        let trace_layer = self.telemetry.grpc_trace_layer();
        let task = tokio::spawn(async move {
            Server::builder()
                .layer(trace_layer)
                .add_service(OrderServiceServer::new(handler))
                .serve_with_incoming_shutdown(incoming, async move {
                    serve_stop.cancelled().await;
                })
                .await
        });
        let mut server = ServerHandle { stop, task };
        info!(addr = %local_addr, "gRPC server serving");

        // 主线阻塞在服务循环：停止信号走正常停机路径，
        // 服务循环先行退出视为致命传输错误
        let serve_exit: Option<Result<Result<(), tonic::transport::Error>, JoinError>>;
        tokio::select! {
            _ = shutdown.cancelled() => {
                serve_exit = None;
            }
            result = &mut server.task => {
                serve_exit = Some(result);
            }
        }

        match serve_exit {
            None => {
                info!("shutdown requested, beginning teardown");
                state.server = Some(server);
                Ok(())
            }
            Some(Ok(Ok(()))) => Err(anyhow!("transport server exited unexpectedly")),
            Some(Ok(Err(err))) => Err(err).context("transport server failed"),
            Some(Err(err)) => Err(err).context("transport server task panicked"),
        }
    }

    /// 停机序列：取消心跳 → 注销实例 → 停止服务器并关闭监听器 → 刷新遥测
    async fn teardown(self, state: BootstrapState) {
        if let Some(heartbeat) = state.heartbeat {
            heartbeat.shutdown().await;
        }

        if let (Some(registry), Some(instance)) = (&self.registry, &state.registration) {
            match registry.deregister(instance).await {
                Ok(()) => {
                    info!(instance_id = %instance.instance_id, "service instance deregistered");
                }
                Err(err) => warn!(error = %err, "failed to deregister service instance"),
            }
        }

        if let Some(server) = state.server {
            server.stop.cancel();
            match server.task.await {
                Ok(Ok(())) => info!("transport server stopped"),
                Ok(Err(err)) => warn!(error = %err, "transport server shut down with error"),
                Err(err) => warn!(error = %err, "transport server task aborted"),
            }
        }

        self.telemetry.shutdown();
    }
}

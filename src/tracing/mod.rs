//! # 日志与分布式追踪模块
//!
//! 为服务提供统一的日志初始化与（可选的）OpenTelemetry 分布式追踪能力。
//!
//! 注意：OTLP 导出需要启用 `tracing` feature 才能使用。
//! 基础的日志初始化功能不需要 feature gate.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, TelemetryConfig};
use crate::error::TelemetryError;

#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace::SdkTracerProvider;

use tower_http::classify::{GrpcErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;

/// 遥测句柄
///
/// 由 [`init_telemetry`] 构造，在进程退出前通过 [`TelemetryGuard::shutdown`]
/// 刷新并关闭导出管道。显式持有该句柄而不是依赖隐式全局状态，
/// 便于启动器把遥测释放纳入统一的停机序列。
#[derive(Default)]
pub struct TelemetryGuard {
    #[cfg(feature = "tracing")]
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// 为 gRPC 服务器构造追踪中间件层
    pub fn grpc_trace_layer(&self) -> TraceLayer<SharedClassifier<GrpcErrorsAsFailures>> {
        TraceLayer::new_for_grpc()
    }

    /// 刷新并关闭遥测管道，错误只记录不传播
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        if let Some(provider) = self.provider {
            if let Err(err) = provider.shutdown() {
                tracing::warn!(error = %err, "failed to flush telemetry pipeline");
            }
        }
    }
}

/// 初始化日志与追踪
///
/// 优先使用环境变量 RUST_LOG，如果没有则使用配置文件的日志级别。
/// 启用 `tracing` feature 且配置了 OTLP 端点时，额外安装
/// OpenTelemetry 导出层（连接到采集后端）。
pub fn init_telemetry(
    service_name: &str,
    logging: &LoggingConfig,
    telemetry: &TelemetryConfig,
) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(&logging.level),
    };

    #[cfg(feature = "tracing")]
    if let Some(endpoint) = telemetry.otlp_endpoint.as_deref() {
        return otel::init_with_otlp(service_name, logging, endpoint, env_filter);
    }

    let subscriber = fmt::Subscriber::builder()
        .with_target(logging.with_target)
        .with_thread_ids(logging.with_thread_ids)
        .with_file(logging.with_file)
        .with_line_number(logging.with_line_number)
        .with_env_filter(env_filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| TelemetryError::Subscriber(err.to_string()))?;

    if telemetry.otlp_endpoint.is_some() {
        tracing::warn!(
            service = %service_name,
            "otlp endpoint configured but span export is not enabled in this build"
        );
    } else {
        tracing::debug!(service = %service_name, "telemetry initialized (fmt only)");
    }

    Ok(TelemetryGuard::default())
}

#[cfg(feature = "tracing")]
mod otel {
    use opentelemetry::global;
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::{SpanExporter, WithExportConfig};
    use opentelemetry_sdk::Resource;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    use super::TelemetryGuard;
    use crate::config::LoggingConfig;
    use crate::error::TelemetryError;

    /// 初始化 OpenTelemetry OTLP 追踪（通过 OTLP gRPC 协议连接采集后端）
    pub(super) fn init_with_otlp(
        service_name: &str,
        logging: &LoggingConfig,
        endpoint: &str,
        env_filter: EnvFilter,
    ) -> Result<TelemetryGuard, TelemetryError> {
        let exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|err| TelemetryError::Exporter(err.to_string()))?;

        let resource = Resource::builder()
            .with_service_name(service_name.to_string())
            .build();

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build();

        global::set_tracer_provider(provider.clone());
        let tracer = provider.tracer("oms-core");

        let fmt_layer = fmt::layer()
            .with_target(logging.with_target)
            .with_thread_ids(logging.with_thread_ids)
            .with_file(logging.with_file)
            .with_line_number(logging.with_line_number);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()
            .map_err(|err| TelemetryError::Subscriber(err.to_string()))?;

        tracing::info!(
            service = %service_name,
            endpoint = %endpoint,
            "OpenTelemetry OTLP tracing initialized"
        );

        Ok(TelemetryGuard {
            provider: Some(provider),
        })
    }
}

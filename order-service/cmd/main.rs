use anyhow::{Context, Result};
use order_service::Bootstrap;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use oms_core::config::load_config;
use oms_core::tracing::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（致命）
    let config = load_config(None).context("failed to load configuration")?;

    // 初始化日志与遥测（致命）
    let telemetry = init_telemetry(&config.service.name, &config.logging, &config.telemetry)
        .context("failed to initialize telemetry")?;

    info!(service = %config.service.name, "service starting");

    // 进程停止信号驱动统一的停机序列
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    let result = async {
        let bootstrap = Bootstrap::from_config(config, telemetry).await?;
        bootstrap.run(shutdown).await
    }
    .await;

    if let Err(err) = result {
        error!(error = %format!("{err:#}"), "service terminated with fatal error");
        return Err(err);
    }

    info!("service stopped");
    Ok(())
}

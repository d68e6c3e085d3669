//! 核心错误类型
//!
//! 每个基础设施关注点一个错误枚举，调用方通过 `Result` 显式消费失败结果

use std::path::PathBuf;

use thiserror::Error;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] toml::de::Error),
}

/// 遥测初始化错误
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
    #[error("failed to initialize span exporter: {0}")]
    Exporter(String),
}

/// 服务注册发现错误
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("unsupported registry type: {0}")]
    UnsupportedBackend(String),
    /// 心跳或注销发生在注册成功之前
    #[error("service instance is not registered")]
    NotRegistered,
    #[error("registry backend error: {0}")]
    Backend(String),
    #[error("failed to encode instance payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<etcd_client::Error> for DiscoveryError {
    fn from(err: etcd_client::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// 消息代理错误
#[derive(Debug, Error)]
pub enum BrokerError {
    /// 拓扑尚未建立，服务处于降级模式
    #[error("broker topology is not provisioned")]
    NotProvisioned,
    #[error("broker connection failed: {0}")]
    Connect(String),
    #[error("broker channel error: {0}")]
    Channel(String),
}

impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        Self::Channel(err.to_string())
    }
}

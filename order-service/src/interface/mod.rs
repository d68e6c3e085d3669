//! 接口层

pub mod grpc;

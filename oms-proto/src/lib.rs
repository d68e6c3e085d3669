//! OMS Proto 定义
//!
//! 由 `tonic-prost-build` 从 `proto/` 目录生成的 gRPC 类型与服务

pub mod order {
    tonic::include_proto!("order.v1");
}

//! gRPC 接口

pub mod handler;

pub use handler::OrderGrpcHandler;

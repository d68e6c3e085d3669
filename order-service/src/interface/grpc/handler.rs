//! 订单 gRPC 处理器

use std::sync::Arc;

use tonic::{Request, Response, Status};

use oms_proto::order::order_service_server::OrderService;
use oms_proto::order::{CreateOrderRequest, CreateOrderResponse};

use crate::application::OrderApplication;
use crate::domain::{OrderError, OrderItem};

pub struct OrderGrpcHandler {
    application: Arc<OrderApplication>,
}

impl OrderGrpcHandler {
    pub fn new(application: Arc<OrderApplication>) -> Self {
        Self { application }
    }
}

#[tonic::async_trait]
impl OrderService for OrderGrpcHandler {
    async fn create_order(
        &self,
        request: Request<CreateOrderRequest>,
    ) -> Result<Response<CreateOrderResponse>, Status> {
        let request = request.into_inner();
        let items = request
            .items
            .into_iter()
            .map(|item| OrderItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        let order = self
            .application
            .create_order(request.customer_id, items)
            .await
            .map_err(order_error_to_status)?;

        Ok(Response::new(CreateOrderResponse {
            order_id: order.order_id,
            status: order.status.as_str().to_string(),
        }))
    }
}

fn order_error_to_status(err: OrderError) -> Status {
    match err {
        // 代理降级时请求可以稍后重试
        OrderError::EventPublish(_) => {
            Status::unavailable("order event cannot be published, try again later")
        }
        other => Status::invalid_argument(other.to_string()),
    }
}

//! HTTP handlers for `/api/v1/orders`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crate::error::ServiceError;
use crate::http::response::{self, Meta};
use crate::services::orders::model::{CreateOrderRequest, ListOrdersQuery, UpdateOrderRequest};
use crate::services::orders::service::OrderService;

pub fn routes(service: Arc<OrderService>) -> Router {
    Router::new()
        .route("/api/v1/orders", post(create_order).get(list_orders))
        .route(
            "/api/v1/orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .with_state(service)
}

async fn create_order(
    State(service): State<Arc<OrderService>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Response, ServiceError> {
    Ok(response::created(service.create_order(request).await?))
}

async fn get_order(
    State(service): State<Arc<OrderService>>,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError> {
    Ok(response::ok(service.get_order(id).await?))
}

async fn update_order(
    State(service): State<Arc<OrderService>>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Response, ServiceError> {
    Ok(response::ok(service.update_order(id, request).await?))
}

async fn delete_order(
    State(service): State<Arc<OrderService>>,
    Path(id): Path<u64>,
) -> Result<Response, ServiceError> {
    service.delete_order(id).await?;
    Ok(response::ok(serde_json::json!({ "message": "order deleted" })))
}

async fn list_orders(
    State(service): State<Arc<OrderService>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Response, ServiceError> {
    let (query, page) = service.list_orders(query).await?;
    let meta = Meta::new(query.page(), query.page_size(), page.total);
    Ok(response::paginated(page.orders, meta))
}

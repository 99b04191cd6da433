//! Order API handlers: create, list, fetch, cancel. Each mutating call
//! delegates entirely to `engine::gateway` — the handler's only job is
//! extracting the authenticated caller and translating the result.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::engine::{gateway, read};
use crate::models::order::{CreateOrderRequest, CreateOrderResponse, OrderResponse};
use crate::utils::AppError;
use crate::AppState;

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    crate::metrics::record_order_submitted(
        &req.direction.to_string(),
        if req.price.is_some() { "limit" } else { "market" },
    );

    let order = gateway::create_order(&state.db, auth_user.user_id, req).await?;

    Ok(Json(CreateOrderResponse {
        success: true,
        order_id: order.id,
    }))
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = read::orders_for_user(&state.db, auth_user.user_id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = read::order_for_user(&state.db, auth_user.user_id, order_id).await?;
    Ok(Json(order.into()))
}

#[derive(serde::Serialize)]
pub struct CancelOrderResponse {
    pub success: bool,
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CancelOrderResponse>, AppError> {
    gateway::cancel_order(&state.db, auth_user.user_id, order_id).await?;
    crate::metrics::record_order_cancelled();
    Ok(Json(CancelOrderResponse { success: true }))
}

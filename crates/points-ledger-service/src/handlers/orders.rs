//! 订单来源 API 处理器
//!
//! 供外部订单系统写入订单、变更订单状态和登记用户

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::{
    error::Result,
    models::{Order, OrderStatus},
    service::dto::ApiResponse,
    state::AppState,
};

// ==================== DTO 定义 ====================

/// 订单写入请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordOrderRequest {
    #[validate(length(min = 1, max = 64, message = "订单ID长度必须在1-64个字符之间"))]
    pub order_id: String,
    #[validate(length(min = 1, max = 64, message = "用户ID长度必须在1-64个字符之间"))]
    pub user_id: String,
    #[validate(range(min = 0, message = "订单积分不能为负数"))]
    pub points: i64,
    #[serde(default)]
    pub status: OrderStatus,
}

/// 订单状态变更请求
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// ==================== 处理器 ====================

/// 登记用户（幂等）
///
/// PUT /api/v1/users/{user_id}
pub async fn register_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    state.store.register_user(&user_id).await?;
    info!(user_id = %user_id, "用户已登记");
    Ok(Json(ApiResponse::success_empty()))
}

/// 写入订单（按 order_id 幂等）
///
/// POST /api/v1/orders
pub async fn record_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecordOrderRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>> {
    let Json(req) = payload?;
    req.validate()?;

    let order = Order::new(req.order_id, req.user_id, req.points, req.status);
    state.store.record_order(&order).await?;

    info!(
        order_id = %order.order_id,
        user_id = %order.user_id,
        points = order.points,
        status = ?order.status,
        "订单已记录"
    );
    Ok(Json(ApiResponse::success_empty()))
}

/// 变更订单状态
///
/// PATCH /api/v1/orders/{order_id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: std::result::Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Order>>> {
    let Json(req) = payload?;
    let order = state
        .store
        .update_order_status(&order_id, req.status)
        .await?;

    info!(
        order_id = %order_id,
        status = ?order.status,
        "订单状态已更新"
    );
    Ok(Json(ApiResponse::success(order)))
}

//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState};

/// 积分账本路由（挂载在 `/api/v1` 下）
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 余额与兑换
        .route("/users/{user_id}", put(handlers::orders::register_user))
        .route("/users/{user_id}/balance", get(handlers::points::get_balance))
        .route(
            "/users/{user_id}/redemptions",
            post(handlers::points::redeem_points).get(handlers::points::list_redemptions),
        )
        // 订单来源
        .route("/orders", post(handlers::orders::record_order))
        .route(
            "/orders/{order_id}/status",
            patch(handlers::orders::update_order_status),
        )
}

/// 构建完整的应用路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

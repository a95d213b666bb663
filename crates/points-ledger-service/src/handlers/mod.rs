//! HTTP 请求处理器模块
//!
//! 包含所有 REST API 端点的处理器实现

pub mod orders;
pub mod points;

use axum::Json;

/// 存活检查：服务进程正常即返回 ok
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "points-ledger-service"
    }))
}

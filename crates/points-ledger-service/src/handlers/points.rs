//! 积分余额与兑换 API 处理器

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{LedgerError, Result},
    service::dto::{
        ApiResponse, BalanceResponse, HistoryQuery, RedeemPointsResponse,
        RedemptionHistoryResponse,
    },
    state::AppState,
};

// ==================== DTO 定义 ====================

/// 兑换请求
///
/// `points` 按原始 JSON 值接收，非整数（小数、字符串、缺失）统一报 `InvalidAmount`
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemPointsRequest {
    #[serde(default)]
    pub points: serde_json::Value,
}

impl RedeemPointsRequest {
    /// 解析兑换积分数（不校验正负，由兑换服务负责）
    pub fn points(&self) -> Result<i64> {
        self.points
            .as_i64()
            .ok_or_else(|| LedgerError::InvalidAmount {
                points: self.points.to_string(),
            })
    }
}

// ==================== 处理器 ====================

/// 查询用户积分余额
///
/// GET /api/v1/users/{user_id}/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<BalanceResponse>>> {
    let balance = state.query_service.get_balance(&user_id).await?;
    Ok(Json(ApiResponse::success(balance)))
}

/// 兑换积分
///
/// POST /api/v1/users/{user_id}/redemptions
pub async fn redeem_points(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<RedeemPointsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RedeemPointsResponse>>> {
    let Json(req) = payload?;
    let points = req.points()?;
    info!(user_id = %user_id, points = points, "收到积分兑换请求");

    let response = state.redemption_service.redeem(&user_id, points).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 查询兑换历史
///
/// GET /api/v1/users/{user_id}/redemptions?limit=&offset=
pub async fn list_redemptions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<RedemptionHistoryResponse>>> {
    let Query(query) = query?;
    let history = state
        .query_service
        .get_redemption_history(&user_id, query.limit()?, query.offset()?)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

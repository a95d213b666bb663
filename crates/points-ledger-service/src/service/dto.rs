//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦，
//! 以及 REST API 的统一响应外壳

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::models::{BalanceSnapshot, Redemption};

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 创建成功响应（无数据）
    pub fn success_empty() -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: None,
        }
    }
}

/// 余额查询响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
    pub earned_points: i64,
    pub redeemed_points: i64,
}

impl BalanceResponse {
    pub fn new(user_id: impl Into<String>, snapshot: BalanceSnapshot) -> Self {
        Self {
            user_id: user_id.into(),
            balance: snapshot.balance,
            earned_points: snapshot.earned_points,
            redeemed_points: snapshot.redeemed_points,
        }
    }
}

/// 兑换成功响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemPointsResponse {
    pub redemption_id: String,
    pub user_id: String,
    pub points: i64,
    pub timestamp: DateTime<Utc>,
    /// 本次兑换后的余额
    pub new_balance: i64,
}

impl RedeemPointsResponse {
    pub fn new(redemption: Redemption, new_balance: i64) -> Self {
        Self {
            redemption_id: redemption.redemption_id,
            user_id: redemption.user_id,
            points: redemption.points,
            timestamp: redemption.timestamp,
            new_balance,
        }
    }
}

/// 兑换历史条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionDto {
    pub redemption_id: String,
    pub points: i64,
    pub timestamp: DateTime<Utc>,
}

impl From<Redemption> for RedemptionDto {
    fn from(redemption: Redemption) -> Self {
        Self {
            redemption_id: redemption.redemption_id,
            points: redemption.points,
            timestamp: redemption.timestamp,
        }
    }
}

/// 兑换历史分页响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionHistoryResponse {
    pub user_id: String,
    /// 按时间倒序排列的当前页
    pub redemptions: Vec<RedemptionDto>,
    /// 该用户的兑换记录总数（与分页无关）
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// 兑换历史分页参数
///
/// 按原始字符串接收，非整数报 `InvalidPagination` 而不是由提取器拒绝
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl HistoryQuery {
    pub fn limit(&self) -> Result<Option<i64>> {
        page_param("limit", self.limit.as_deref())
    }

    pub fn offset(&self) -> Result<Option<i64>> {
        page_param("offset", self.offset.as_deref())
    }
}

/// 解析分页参数；空串视为未提供，取值范围由查询服务校验
fn page_param(field: &'static str, raw: Option<&str>) -> Result<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| LedgerError::InvalidPagination {
                field,
                value: value.to_string(),
            }),
    }
}

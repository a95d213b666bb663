//! 积分账本服务错误类型
//!
//! 定义服务层的业务错误和系统错误，以及到 HTTP 响应的映射

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// 积分账本错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 请求参数错误 ===
    #[error("兑换积分必须为正整数: points={points}")]
    InvalidAmount { points: String },

    #[error("分页参数无效: {field}={value}")]
    InvalidPagination { field: &'static str, value: String },

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 用户 / 订单相关错误 ===
    #[error("用户不存在: {0}")]
    UserNotFound(String),

    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("订单内容与已记录的不一致: {0}")]
    OrderConflict(String),

    // === 兑换相关错误 ===
    #[error("积分余额不足: 可用 {available}, 请求 {requested}")]
    InsufficientPoints { available: i64, requested: i64 },

    #[error("等待用户锁超时: user_id={user_id}")]
    LockTimeout { user_id: String },

    #[error("兑换记录写入超时且未提交: redemption_id={redemption_id}")]
    AppendTimeout { redemption_id: String },

    #[error("积分余额数据异常: user_id={user_id}, balance={balance}")]
    BalanceIntegrity { user_id: String, balance: i64 },

    // === 系统错误 ===
    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 积分账本 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl LedgerError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount { .. } | Self::InvalidPagination { .. } | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }

            Self::UserNotFound(_) | Self::OrderNotFound(_) => StatusCode::NOT_FOUND,

            Self::InsufficientPoints { .. } | Self::OrderConflict(_) => StatusCode::CONFLICT,

            Self::LockTimeout { .. } | Self::AppendTimeout { .. } | Self::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            Self::BalanceIntegrity { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 检查是否为可重试的错误
    ///
    /// 只有基础设施类错误值得调用方退避重试，业务错误原样重试只会得到相同结果
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::LockTimeout { .. } | Self::AppendTimeout { .. }
        )
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::StoreUnavailable(_)
                | Self::LockTimeout { .. }
                | Self::AppendTimeout { .. }
                | Self::BalanceIntegrity { .. }
                | Self::Internal(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidPagination { .. } => "INVALID_PAGINATION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::OrderConflict(_) => "ORDER_CONFLICT",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::LockTimeout { .. } => "LOCK_TIMEOUT",
            Self::AppendTimeout { .. } => "APPEND_TIMEOUT",
            Self::BalanceIntegrity { .. } => "BALANCE_INTEGRITY",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::StoreUnavailable(e) => {
                tracing::error!(error = %e, "事件存储不可用");
                "服务暂时不可用，请稍后重试".to_string()
            }
            Self::BalanceIntegrity { user_id, balance } => {
                tracing::error!(user_id = %user_id, balance = balance, "积分余额数据异常");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 请求体无法解析为 JSON 或缺少必填字段
impl From<JsonRejection> for LedgerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for LedgerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

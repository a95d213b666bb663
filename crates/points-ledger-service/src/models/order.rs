//! 订单模型
//!
//! 订单由外部订单系统产生，本服务只读取其积分和状态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 订单状态
///
/// 取消和退款通过状态变更表达，不会产生新的负向事件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum OrderStatus {
    /// 有效 - 积分计入余额
    #[default]
    Active,
    /// 已取消
    Cancelled,
    /// 已退款
    Refunded,
}

impl OrderStatus {
    /// 该状态的订单是否计入已获得积分
    pub fn earns_points(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// 订单
///
/// 记录后除 `status` 外不可变更，且永不删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub points: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        order_id: impl Into<String>,
        user_id: impl Into<String>,
        points: i64,
        status: OrderStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id: order_id.into(),
            user_id: user_id.into(),
            points,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// 判断重复投递的订单是否与已记录的订单描述同一笔交易
    ///
    /// 同一 order_id 只允许状态不同
    pub fn is_same_order(&self, other: &Order) -> bool {
        self.order_id == other.order_id
            && self.user_id == other.user_id
            && self.points == other.points
    }
}

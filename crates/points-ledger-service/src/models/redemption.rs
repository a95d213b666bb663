//! 兑换记录模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 兑换记录
///
/// 只能由兑换协调器在校验通过后创建，写入后永不修改或删除（审计轨迹）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub redemption_id: String,
    pub user_id: String,
    pub points: i64,
    #[sqlx(rename = "redeemed_at")]
    pub timestamp: DateTime<Utc>,
}

impl Redemption {
    /// 生成一条新的兑换记录（新 ID，当前时间）
    pub fn issue(user_id: impl Into<String>, points: i64) -> Self {
        Self {
            redemption_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            points,
            timestamp: Utc::now(),
        }
    }
}

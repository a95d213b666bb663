//! 余额快照

use serde::{Deserialize, Serialize};

/// 由订单和兑换记录推导出的余额
///
/// 不落库、不缓存，每次读取时重新计算
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub earned_points: i64,
    pub redeemed_points: i64,
    pub balance: i64,
}

impl BalanceSnapshot {
    /// 余额是否满足非负不变式
    pub fn is_consistent(&self) -> bool {
        self.balance >= 0
    }

    /// 能否支付指定积分
    pub fn covers(&self, points: i64) -> bool {
        points <= self.balance
    }
}

//! 余额计算
//!
//! 纯函数：根据订单和兑换记录计算余额快照，无副作用、不缓存。

use crate::error::{LedgerError, Result};
use crate::models::{BalanceSnapshot, Order, Redemption};

/// 计算余额快照
///
/// - 只累计 `status == active` 的订单积分
/// - 兑换记录没有状态，全部计入
/// - 不做截断：余额为负说明上游不变式被破坏，由调用方决定如何暴露
///
/// 累加使用 checked 运算，溢出时返回 `Internal` 而不是静默回绕。
pub fn compute_balance(orders: &[Order], redemptions: &[Redemption]) -> Result<BalanceSnapshot> {
    let earned_points = checked_sum(
        orders
            .iter()
            .filter(|o| o.status.earns_points())
            .map(|o| o.points),
    )
    .ok_or_else(|| LedgerError::Internal("earned points overflow".to_string()))?;

    let redeemed_points = checked_sum(redemptions.iter().map(|r| r.points))
        .ok_or_else(|| LedgerError::Internal("redeemed points overflow".to_string()))?;

    let balance = earned_points
        .checked_sub(redeemed_points)
        .ok_or_else(|| LedgerError::Internal("balance overflow".to_string()))?;

    Ok(BalanceSnapshot {
        earned_points,
        redeemed_points,
        balance,
    })
}

fn checked_sum(mut values: impl Iterator<Item = i64>) -> Option<i64> {
    values.try_fold(0i64, |acc, v| acc.checked_add(v))
}

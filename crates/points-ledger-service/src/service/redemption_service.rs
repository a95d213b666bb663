//! 积分兑换服务
//!
//! 兑换协调器：同一用户的兑换决策在用户锁内线性化执行，
//! 保证并发请求下余额永不透支。
//!
//! ## 兑换流程
//!
//! 1. 金额校验 -> 2. 用户存在性 -> 3. 获取用户锁
//!    -> 4. 基于当前存储状态重算余额 -> 5. 余额校验 -> 6. 追加兑换记录 -> 7. 释放锁
//!
//! ## 写入超时
//!
//! 追加在独立任务中执行，任务持有用户锁守卫直到写入落定（提交或失败）。
//! 超过 `append_timeout` 后协调器不会丢弃进行中的写入，而是等待其落定再通过
//! `get_redemption` 确认结果，因此同一用户的下一次兑换总是基于已确定的状态校验。
//! 写入本身的上限由存储实现负责（PostgreSQL 使用 `statement_timeout`）。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::{error, info, instrument, warn};

use points_shared::config::LedgerConfig;

use crate::error::{LedgerError, Result};
use crate::lock::{LockConfig, UserLockGuard, UserLockManager};
use crate::models::Redemption;
use crate::repository::EventStore;
use crate::service::balance_calculator::compute_balance;
use crate::service::dto::RedeemPointsResponse;

/// 积分兑换服务
///
/// 持有事件存储和用户锁管理器；对不同用户的兑换互不阻塞。
pub struct RedemptionService<S: ?Sized> {
    store: Arc<S>,
    locks: UserLockManager,
    append_timeout: Duration,
}

impl<S> RedemptionService<S>
where
    S: EventStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, locks: UserLockManager, append_timeout: Duration) -> Self {
        Self {
            store,
            locks,
            append_timeout,
        }
    }

    /// 根据账本配置创建服务
    pub fn from_config(store: Arc<S>, config: &LedgerConfig) -> Self {
        let locks = UserLockManager::new(LockConfig {
            acquire_timeout: config.lock_timeout(),
        });
        Self::new(store, locks, config.append_timeout())
    }

    /// 兑换积分
    ///
    /// 成功返回时兑换记录已对后续读取可见。
    /// 任何失败都不会留下部分写入：`LockTimeout` 与 `AppendTimeout` 均表示未提交。
    #[instrument(skip(self), fields(user_id = %user_id, points = points))]
    pub async fn redeem(&self, user_id: &str, points: i64) -> Result<RedeemPointsResponse> {
        if points <= 0 {
            return Err(LedgerError::InvalidAmount {
                points: points.to_string(),
            });
        }

        if !self.store.user_exists(user_id).await? {
            return Err(LedgerError::UserNotFound(user_id.to_string()));
        }

        // 校验失败时守卫随作用域 drop；进入写入阶段后守卫交给写入任务
        let guard = self.locks.acquire(user_id).await?;

        let (orders, redemptions) = tokio::try_join!(
            self.store.list_orders(user_id),
            self.store.list_redemptions(user_id)
        )?;
        let snapshot = compute_balance(&orders, &redemptions)?;

        if !snapshot.is_consistent() {
            error!(
                user_id = %user_id,
                balance = snapshot.balance,
                earned_points = snapshot.earned_points,
                redeemed_points = snapshot.redeemed_points,
                "积分余额为负，账本不变式被破坏"
            );
        }

        if !snapshot.covers(points) {
            info!(
                user_id = %user_id,
                available = snapshot.balance,
                requested = points,
                "积分不足，拒绝兑换"
            );
            return Err(LedgerError::InsufficientPoints {
                available: snapshot.balance,
                requested: points,
            });
        }

        let redemption = Redemption::issue(user_id, points);
        self.append(&redemption, guard).await?;

        let new_balance = snapshot.balance - points;
        info!(
            user_id = %user_id,
            redemption_id = %redemption.redemption_id,
            points = points,
            new_balance = new_balance,
            "积分兑换成功"
        );

        Ok(RedeemPointsResponse::new(redemption, new_balance))
    }

    /// 追加兑换记录
    ///
    /// 写入任务持有锁守卫，协调器超时返回前写入一定已经落定，调用方拿到的结果是确定的。
    async fn append(&self, redemption: &Redemption, guard: UserLockGuard) -> Result<()> {
        let store = Arc::clone(&self.store);
        let pending = redemption.clone();
        let mut write = tokio::spawn(async move {
            let _guard = guard;
            store.append_redemption(&pending).await
        });

        match tokio::time::timeout(self.append_timeout, &mut write).await {
            Ok(joined) => settle(joined),
            Err(_) => {
                warn!(
                    redemption_id = %redemption.redemption_id,
                    timeout_ms = self.append_timeout.as_millis() as u64,
                    "Redemption append timed out, waiting for the write to settle"
                );
                if let Err(e) = settle(write.await) {
                    warn!(
                        redemption_id = %redemption.redemption_id,
                        error = %e,
                        "Timed out redemption append settled with error"
                    );
                }

                match self.store.get_redemption(&redemption.redemption_id).await? {
                    Some(_) => {
                        warn!(
                            redemption_id = %redemption.redemption_id,
                            "Redemption committed despite append timeout"
                        );
                        Ok(())
                    }
                    None => Err(LedgerError::AppendTimeout {
                        redemption_id: redemption.redemption_id.clone(),
                    }),
                }
            }
        }
    }
}

fn settle(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| LedgerError::Internal(format!("redemption write task failed: {}", e)))?
}

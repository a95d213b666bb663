//! 积分查询服务
//!
//! 提供余额与兑换历史的只读查询。查询不加用户锁，
//! 每次都从事件存储读取最新已提交状态并重算余额，不做缓存。

use std::sync::Arc;

use tracing::{error, instrument};

use points_shared::config::LedgerConfig;

use crate::error::{LedgerError, Result};
use crate::models::Redemption;
use crate::repository::EventStore;
use crate::service::balance_calculator::compute_balance;
use crate::service::dto::{BalanceResponse, RedemptionDto, RedemptionHistoryResponse};

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// 积分查询服务
pub struct PointsQueryService<S: ?Sized> {
    store: Arc<S>,
    default_page_size: i64,
}

impl<S> PointsQueryService<S>
where
    S: EventStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// 根据账本配置创建服务
    pub fn from_config(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            store,
            default_page_size: config.default_page_size.max(1),
        }
    }

    /// 查询用户余额
    ///
    /// 余额为负时返回 `BalanceIntegrity`，不会截断为 0。
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_balance(&self, user_id: &str) -> Result<BalanceResponse> {
        self.ensure_user(user_id).await?;

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
            return Err(LedgerError::BalanceIntegrity {
                user_id: user_id.to_string(),
                balance: snapshot.balance,
            });
        }

        Ok(BalanceResponse::new(user_id, snapshot))
    }

    /// 查询兑换历史
    ///
    /// 按时间倒序，同一时间戳按追加顺序倒序；分页是对排序结果的简单切片。
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_redemption_history(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<RedemptionHistoryResponse> {
        let limit = limit.unwrap_or(self.default_page_size);
        let offset = offset.unwrap_or(0);
        validate_pagination(limit, offset)?;

        self.ensure_user(user_id).await?;

        let redemptions = sort_newest_first(self.store.list_redemptions(user_id).await?);
        let total = redemptions.len() as i64;

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let page: Vec<RedemptionDto> = redemptions
            .into_iter()
            .skip(skip)
            .take(take)
            .map(RedemptionDto::from)
            .collect();

        Ok(RedemptionHistoryResponse {
            user_id: user_id.to_string(),
            redemptions: page,
            total,
            limit,
            offset,
        })
    }

    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(LedgerError::UserNotFound(user_id.to_string()))
        }
    }
}

/// 校验分页参数：limit >= 1，offset >= 0
fn validate_pagination(limit: i64, offset: i64) -> Result<()> {
    if limit < 1 {
        return Err(LedgerError::InvalidPagination {
            field: "limit",
            value: limit.to_string(),
        });
    }
    if offset < 0 {
        return Err(LedgerError::InvalidPagination {
            field: "offset",
            value: offset.to_string(),
        });
    }
    Ok(())
}

/// 按时间倒序排列（输入须为追加顺序）
///
/// 先整体反转再稳定排序，时间戳相同的记录保持“后追加的在前”。
fn sort_newest_first(mut redemptions: Vec<Redemption>) -> Vec<Redemption> {
    redemptions.reverse();
    redemptions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    redemptions
}

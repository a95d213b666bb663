//! 事件存储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，支持运行时选择后端和 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Order, OrderStatus, Redemption};

/// 积分事件存储接口
///
/// 对未知用户的列表查询返回空集合而不是错误；
/// `list_redemptions` 按追加顺序返回，排序的平局裁决依赖这一点。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    // 读
    async fn list_orders(&self, user_id: &str) -> Result<Vec<Order>>;
    async fn list_redemptions(&self, user_id: &str) -> Result<Vec<Redemption>>;
    async fn get_redemption(&self, redemption_id: &str) -> Result<Option<Redemption>>;
    async fn user_exists(&self, user_id: &str) -> Result<bool>;

    /// 追加兑换记录
    ///
    /// 原子：要么完整可见，要么完全不可见。实现需自行限定写入时长，
    /// 调用方超时后会等待写入落定再确认结果。
    /// 实现可以在写入前复核余额，不足时返回 `InsufficientPoints`。
    async fn append_redemption(&self, redemption: &Redemption) -> Result<()>;

    // 订单来源（外部订单系统）
    async fn register_user(&self, user_id: &str) -> Result<()>;
    async fn record_order(&self, order: &Order) -> Result<()>;
    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<Order>;
}

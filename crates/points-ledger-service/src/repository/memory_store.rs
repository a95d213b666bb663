//! 内存事件存储
//!
//! 使用 DashMap 实现的高并发内存存储，适用于测试和开发环境。

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::models::{Order, OrderStatus, Redemption};

use super::traits::EventStore;

/// 内存事件存储
///
/// 所有读取都在分片锁内克隆出快照后立即释放锁（copy-on-read），
/// 因此读者看到的集合不会被并发追加破坏，也不会阻塞写入方。
///
/// 锁顺序固定为 `order_owner -> user_orders`、`redemptions -> redemption_index`，
/// 不同方法之间不存在反向嵌套。
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    /// user_id -> 订单列表（键存在即视为已知用户）
    user_orders: DashMap<String, Vec<Order>>,
    /// order_id -> user_id
    order_owner: DashMap<String, String>,
    /// user_id -> 兑换记录（按追加顺序）
    redemptions: DashMap<String, Vec<Redemption>>,
    /// redemption_id -> user_id
    redemption_index: DashMap<String, String>,
}

impl MemoryEventStore {
    /// 创建新的内存存储实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 已知用户数量
    pub fn user_count(&self) -> usize {
        self.user_orders.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list_orders(&self, user_id: &str) -> Result<Vec<Order>> {
        Ok(self
            .user_orders
            .get(user_id)
            .map(|orders| orders.value().clone())
            .unwrap_or_default())
    }

    async fn list_redemptions(&self, user_id: &str) -> Result<Vec<Redemption>> {
        Ok(self
            .redemptions
            .get(user_id)
            .map(|items| items.value().clone())
            .unwrap_or_default())
    }

    async fn get_redemption(&self, redemption_id: &str) -> Result<Option<Redemption>> {
        let Some(user_id) = self
            .redemption_index
            .get(redemption_id)
            .map(|owner| owner.value().clone())
        else {
            return Ok(None);
        };

        Ok(self.redemptions.get(&user_id).and_then(|items| {
            items
                .iter()
                .find(|r| r.redemption_id == redemption_id)
                .cloned()
        }))
    }

    async fn user_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.user_orders.contains_key(user_id))
    }

    async fn append_redemption(&self, redemption: &Redemption) -> Result<()> {
        let mut items = self
            .redemptions
            .entry(redemption.user_id.clone())
            .or_default();

        // 持有用户分片写锁期间完成去重和两处写入，读者要么看到完整记录，要么看不到
        match self.redemption_index.entry(redemption.redemption_id.clone()) {
            Entry::Occupied(_) => {
                return Err(LedgerError::Internal(format!(
                    "duplicate redemption_id: {}",
                    redemption.redemption_id
                )));
            }
            Entry::Vacant(slot) => {
                items.push(redemption.clone());
                slot.insert(redemption.user_id.clone());
            }
        }

        debug!(
            user_id = %redemption.user_id,
            redemption_id = %redemption.redemption_id,
            "Redemption appended"
        );
        Ok(())
    }

    async fn register_user(&self, user_id: &str) -> Result<()> {
        self.user_orders.entry(user_id.to_string()).or_default();
        Ok(())
    }

    async fn record_order(&self, order: &Order) -> Result<()> {
        match self.order_owner.entry(order.order_id.clone()) {
            Entry::Occupied(owner) => {
                let mut orders = self
                    .user_orders
                    .get_mut(owner.get())
                    .ok_or_else(|| LedgerError::Internal(format!(
                        "order index out of sync: {}",
                        order.order_id
                    )))?;
                let existing = orders
                    .iter_mut()
                    .find(|o| o.order_id == order.order_id)
                    .ok_or_else(|| LedgerError::Internal(format!(
                        "order index out of sync: {}",
                        order.order_id
                    )))?;

                if !existing.is_same_order(order) {
                    return Err(LedgerError::OrderConflict(order.order_id.clone()));
                }
                if existing.status != order.status {
                    existing.status = order.status;
                    existing.updated_at = Utc::now();
                }
            }
            Entry::Vacant(slot) => {
                self.user_orders
                    .entry(order.user_id.clone())
                    .or_default()
                    .push(order.clone());
                slot.insert(order.user_id.clone());
            }
        }
        Ok(())
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let user_id = self
            .order_owner
            .get(order_id)
            .map(|owner| owner.value().clone())
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        let mut orders = self
            .user_orders
            .get_mut(&user_id)
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        let order = orders
            .iter_mut()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, user_id: &str, points: i64, status: OrderStatus) -> Order {
        Order::new(id, user_id, points, status)
    }

    #[tokio::test]
    async fn test_unknown_user_lists_are_empty() {
        let store = MemoryEventStore::new();
        assert!(store.list_orders("ghost").await.unwrap().is_empty());
        assert!(store.list_redemptions("ghost").await.unwrap().is_empty());
        assert!(!store.user_exists("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_order_registers_user() {
        let store = MemoryEventStore::new();
        store
            .record_order(&order("o-1", "user-1", 100, OrderStatus::Active))
            .await
            .unwrap();

        assert!(store.user_exists("user-1").await.unwrap());
        assert_eq!(store.list_orders("user-1").await.unwrap().len(), 1);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_register_user_without_orders() {
        let store = MemoryEventStore::new();
        store.register_user("user-1").await.unwrap();
        store.register_user("user-1").await.unwrap();

        assert!(store.user_exists("user-1").await.unwrap());
        assert!(store.list_orders("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_order_redelivery_updates_status_only() {
        let store = MemoryEventStore::new();
        store
            .record_order(&order("o-1", "user-1", 100, OrderStatus::Active))
            .await
            .unwrap();
        store
            .record_order(&order("o-1", "user-1", 100, OrderStatus::Refunded))
            .await
            .unwrap();

        let orders = store.list_orders("user-1").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn test_record_order_conflict() {
        let store = MemoryEventStore::new();
        store
            .record_order(&order("o-1", "user-1", 100, OrderStatus::Active))
            .await
            .unwrap();

        let err = store
            .record_order(&order("o-1", "user-1", 500, OrderStatus::Active))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::OrderConflict(id) if id == "o-1"));

        let err = store
            .record_order(&order("o-1", "user-2", 100, OrderStatus::Active))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::OrderConflict(_)));
    }

    #[tokio::test]
    async fn test_update_order_status() {
        let store = MemoryEventStore::new();
        store
            .record_order(&order("o-1", "user-1", 100, OrderStatus::Active))
            .await
            .unwrap();

        let updated = store
            .update_order_status("o-1", OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Cancelled);
        assert_eq!(
            store.list_orders("user-1").await.unwrap()[0].status,
            OrderStatus::Cancelled
        );

        let err = store
            .update_order_status("missing", OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_append_redemption_preserves_order_and_is_queryable() {
        let store = MemoryEventStore::new();
        let first = Redemption::issue("user-1", 10);
        let second = Redemption::issue("user-1", 20);
        store.append_redemption(&first).await.unwrap();
        store.append_redemption(&second).await.unwrap();

        let items = store.list_redemptions("user-1").await.unwrap();
        assert_eq!(items, vec![first.clone(), second.clone()]);

        assert_eq!(
            store.get_redemption(&second.redemption_id).await.unwrap(),
            Some(second)
        );
        assert_eq!(store.get_redemption("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_append_duplicate_redemption_rejected() {
        let store = MemoryEventStore::new();
        let redemption = Redemption::issue("user-1", 10);
        store.append_redemption(&redemption).await.unwrap();

        let err = store.append_redemption(&redemption).await.unwrap_err();
        assert!(matches!(err, LedgerError::Internal(_)));
        assert_eq!(store.list_redemptions("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_redemptions_do_not_establish_user() {
        let store = MemoryEventStore::new();
        store
            .append_redemption(&Redemption::issue("user-1", 10))
            .await
            .unwrap();
        assert!(!store.user_exists("user-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_unaffected_by_later_append() {
        let store = MemoryEventStore::new();
        store
            .append_redemption(&Redemption::issue("user-1", 10))
            .await
            .unwrap();

        let snapshot = store.list_redemptions("user-1").await.unwrap();
        store
            .append_redemption(&Redemption::issue("user-1", 20))
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.list_redemptions("user-1").await.unwrap().len(), 2);
    }
}

//! PostgreSQL 事件存储
//!
//! 订单、兑换记录和已知用户分别落在 `orders`、`point_redemptions`、`point_users` 三张表。
//!
//! ## 兑换写入
//!
//! 兑换记录在单个事务内写入：
//!
//! 1. `SET LOCAL statement_timeout` 限定写入时长，超时由服务端回滚
//! 2. `SELECT ... FOR UPDATE` 锁定 `point_users` 中的用户行
//! 3. 在行锁内重算余额，不足时拒绝写入
//! 4. INSERT 兑换记录并提交
//!
//! 进程内用户锁只约束单个实例；行锁与余额复核保证多实例共享同一数据库时也不会透支。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::{debug, info, instrument};

use crate::error::{LedgerError, Result};
use crate::models::{Order, OrderStatus, Redemption};

use super::traits::EventStore;

/// 积分账本的内嵌迁移
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL 事件存储
pub struct PgEventStore {
    pool: PgPool,
    /// 兑换写入事务的语句超时；None 时沿用数据库默认值
    statement_timeout: Option<Duration>,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    /// 设置兑换写入的语句超时
    ///
    /// 应与兑换协调器的 `append_timeout` 一致，使超时的写入由服务端回滚而不是悬挂。
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self))]
    async fn list_orders(&self, user_id: &str) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, user_id, points, status, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn list_redemptions(&self, user_id: &str) -> Result<Vec<Redemption>> {
        // seq 为自增主键，保证按追加顺序返回
        let redemptions = sqlx::query_as::<_, Redemption>(
            r#"
            SELECT redemption_id, user_id, points, redeemed_at
            FROM point_redemptions
            WHERE user_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(redemptions)
    }

    async fn get_redemption(&self, redemption_id: &str) -> Result<Option<Redemption>> {
        let redemption = sqlx::query_as::<_, Redemption>(
            r#"
            SELECT redemption_id, user_id, points, redeemed_at
            FROM point_redemptions
            WHERE redemption_id = $1
            "#,
        )
        .bind(redemption_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redemption)
    }

    async fn user_exists(&self, user_id: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM point_users WHERE user_id = $1)"#)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    #[instrument(skip(self, redemption), fields(user_id = %redemption.user_id, redemption_id = %redemption.redemption_id))]
    async fn append_redemption(&self, redemption: &Redemption) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.statement_timeout {
            // SET 不接受绑定参数；毫秒数为整数，直接格式化
            sqlx::query(&format!(
                "SET LOCAL statement_timeout = {}",
                timeout.as_millis().max(1)
            ))
            .execute(&mut *tx)
            .await?;
        }

        let locked: Option<String> = sqlx::query_scalar(
            r#"SELECT user_id FROM point_users WHERE user_id = $1 FOR UPDATE"#,
        )
        .bind(&redemption.user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(LedgerError::UserNotFound(redemption.user_id.clone()));
        }

        let (earned, redeemed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COALESCE(SUM(points) FILTER (WHERE status = 'active'), 0)::BIGINT
                 FROM orders WHERE user_id = $1),
                (SELECT COALESCE(SUM(points), 0)::BIGINT
                 FROM point_redemptions WHERE user_id = $1)
            "#,
        )
        .bind(&redemption.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let available = earned - redeemed;
        if available < redemption.points {
            info!(
                available = available,
                requested = redemption.points,
                "行锁内余额复核未通过，拒绝写入"
            );
            return Err(LedgerError::InsufficientPoints {
                available,
                requested: redemption.points,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO point_redemptions (redemption_id, user_id, points, redeemed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&redemption.redemption_id)
        .bind(&redemption.user_id)
        .bind(redemption.points)
        .bind(redemption.timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Redemption appended");
        Ok(())
    }

    async fn register_user(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO point_users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, order), fields(order_id = %order.order_id, user_id = %order.user_id))]
    async fn record_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO point_users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING"#,
        )
        .bind(&order.user_id)
        .execute(&mut *tx)
        .await?;

        let existing = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, user_id, points, status, created_at, updated_at
            FROM orders
            WHERE order_id = $1
            FOR UPDATE
            "#,
        )
        .bind(&order.order_id)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some(existing) if !existing.is_same_order(order) => {
                return Err(LedgerError::OrderConflict(order.order_id.clone()));
            }
            Some(existing) if existing.status != order.status => {
                sqlx::query(
                    r#"UPDATE orders SET status = $2, updated_at = NOW() WHERE order_id = $1"#,
                )
                .bind(&order.order_id)
                .bind(order.status)
                .execute(&mut *tx)
                .await?;
            }
            Some(_) => {}
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO orders (order_id, user_id, points, status, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(&order.order_id)
                .bind(&order.user_id)
                .bind(order.points)
                .bind(order.status)
                .bind(order.created_at)
                .bind(order.updated_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET status = $2, updated_at = NOW()
            WHERE order_id = $1
            RETURNING order_id, user_id, points, status, created_at, updated_at
            "#,
        )
        .bind(order_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))
    }
}

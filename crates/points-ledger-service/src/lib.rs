//! 积分账本服务
//!
//! 根据订单事件累计积分、记录积分兑换，并提供实时余额与兑换历史查询。
//!
//! ## 核心功能
//!
//! - **余额计算**：由订单与兑换两条只追加的事件流实时推导，不缓存
//! - **积分兑换**：同一用户的兑换在用户锁内串行执行，并发下永不透支
//! - **查询服务**：余额与兑换历史只读查询，不加锁
//! - **订单来源**：外部订单系统写入订单及其状态变更
//!
//! ## 模块结构
//!
//! - `models`: 订单、兑换记录、余额快照
//! - `repository`: 事件存储（内存 / PostgreSQL）
//! - `lock`: 用户级互斥锁
//! - `service`: 兑换协调器与查询服务
//! - `handlers` / `routes` / `state`: HTTP 接口
//! - `error`: 错误类型定义

pub mod error;
pub mod handlers;
pub mod lock;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

// 重新导出核心类型
pub use error::{LedgerError, Result};
pub use lock::{LockConfig, UserLockGuard, UserLockManager};
pub use models::{BalanceSnapshot, Order, OrderStatus, Redemption};
pub use repository::{EventStore, MIGRATOR, MemoryEventStore, PgEventStore};
pub use service::{
    ApiResponse, BalanceResponse, PointsQueryService, RedeemPointsResponse,
    RedemptionHistoryResponse, RedemptionService, compute_balance,
};
pub use state::AppState;

//! 事件存储层
//!
//! 提供订单与兑换记录的按用户存取接口，封装存储细节。
//!
//! ## 设计原则
//!
//! - 存储只负责持久化，不包含余额逻辑
//! - 兑换记录只追加，不修改、不删除
//! - 定义 trait 接口以支持内存 / PostgreSQL 两种实现以及 mock 测试

mod memory_store;
mod pg_store;
mod traits;

pub use memory_store::MemoryEventStore;
pub use pg_store::{MIGRATOR, PgEventStore};
pub use traits::*;

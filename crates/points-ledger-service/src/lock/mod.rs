//! 用户级互斥锁模块
//!
//! 为每个用户提供一把进程内的公平互斥锁，用于线性化同一用户的兑换决策。
//!
//! ## 设计理念
//!
//! - **按用户加锁**: 不同用户之间互不等待，不存在全局锁
//! - **按需创建、用完回收**: 锁条目在无人持有、无人等待时自动移除，内存占用有界
//! - **FIFO 排队**: 基于 `tokio::sync::Mutex`，等待者按到达顺序获得锁
//! - **RAII 模式**: 通过 `UserLockGuard` 确保任何退出路径上都会释放锁
//!
//! ## 使用示例
//!
//! ```ignore
//! let locks = UserLockManager::new(LockConfig::default());
//!
//! let guard = locks.acquire("user-123").await?;
//! do_critical_work().await?;
//! drop(guard);
//! ```

mod user_lock;

pub use user_lock::{LockConfig, UserLockGuard, UserLockManager};

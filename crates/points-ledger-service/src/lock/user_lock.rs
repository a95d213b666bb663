//! 用户锁管理器
//!
//! DashMap 保存 user_id 到互斥锁的映射，锁本身是 `tokio::sync::Mutex`。

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument, warn};

use crate::error::{LedgerError, Result};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// 锁配置
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// 等待锁的最长时间
    pub acquire_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// 用户锁管理器
///
/// 可以廉价克隆，克隆体共享同一张锁表。
#[derive(Clone)]
pub struct UserLockManager {
    locks: Arc<LockTable>,
    config: LockConfig,
}

impl UserLockManager {
    pub fn new(config: LockConfig) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            config,
        }
    }

    /// 使用默认配置创建锁管理器
    pub fn with_defaults() -> Self {
        Self::new(LockConfig::default())
    }

    /// 获取用户锁
    ///
    /// 在 `acquire_timeout` 内未拿到锁时返回 `LockTimeout`，此时不持有任何锁。
    #[instrument(skip(self))]
    pub async fn acquire(&self, user_id: &str) -> Result<UserLockGuard> {
        let mutex = self.slot(user_id);

        match tokio::time::timeout(self.config.acquire_timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                debug!(user_id = %user_id, "User lock acquired");
                Ok(UserLockGuard {
                    user_id: user_id.to_string(),
                    guard: Some(guard),
                    locks: Arc::clone(&self.locks),
                })
            }
            Err(_) => {
                // 超时的等待者已经放弃了自己的引用，必要时由它来回收条目
                remove_if_idle(&self.locks, user_id);
                warn!(
                    user_id = %user_id,
                    timeout_ms = self.config.acquire_timeout.as_millis() as u64,
                    "Timed out waiting for user lock"
                );
                Err(LedgerError::LockTimeout {
                    user_id: user_id.to_string(),
                })
            }
        }
    }

    /// 当前锁表中的条目数（持有者 + 等待者涉及的用户）
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    /// 取出或创建用户对应的互斥锁
    ///
    /// 克隆在分片锁内完成，与 `remove_if_idle` 的引用计数检查互斥。
    fn slot(&self, user_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}

/// 用户锁守卫
///
/// drop 时释放锁，并在没有其他持有者或等待者时回收锁表条目。
#[derive(Debug)]
pub struct UserLockGuard {
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl UserLockGuard {
    /// 获取锁对应的用户
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        // 先释放互斥锁（同时释放守卫持有的 Arc），再检查条目是否空闲
        drop(self.guard.take());
        remove_if_idle(&self.locks, &self.user_id);
        debug!(user_id = %self.user_id, "User lock released");
    }
}

/// 锁表之外没有任何引用时移除条目
fn remove_if_idle(locks: &LockTable, user_id: &str) {
    locks.remove_if(user_id, |_, mutex| Arc::strong_count(mutex) == 1);
}

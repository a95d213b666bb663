//! 应用状态
//!
//! 在所有 HTTP 处理器之间共享的服务实例

use std::sync::Arc;

use points_shared::config::LedgerConfig;

use crate::repository::EventStore;
use crate::service::{PointsQueryService, RedemptionService};

/// 应用状态
///
/// 存储后端在启动时按配置选择，因此服务统一持有 `dyn EventStore`
#[derive(Clone)]
pub struct AppState {
    /// 事件存储（订单来源接口直接使用）
    pub store: Arc<dyn EventStore>,
    /// 兑换协调器
    pub redemption_service: Arc<RedemptionService<dyn EventStore>>,
    /// 余额与历史查询
    pub query_service: Arc<PointsQueryService<dyn EventStore>>,
}

impl AppState {
    /// 基于同一个事件存储构造全部服务
    pub fn new(store: Arc<dyn EventStore>, config: &LedgerConfig) -> Self {
        Self {
            redemption_service: Arc::new(RedemptionService::from_config(store.clone(), config)),
            query_service: Arc::new(PointsQueryService::from_config(store.clone(), config)),
            store,
        }
    }
}

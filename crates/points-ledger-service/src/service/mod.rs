//! 服务层
//!
//! 实现积分账本业务逻辑，协调事件存储与用户锁。
//!
//! ## 模块结构
//!
//! - `balance_calculator`: 余额计算（纯函数）
//! - `dto`: 数据传输对象定义
//! - `redemption_service`: 兑换协调器（写路径，按用户串行）
//! - `query_service`: 余额与历史查询（只读，无锁）

pub mod balance_calculator;
pub mod dto;
pub mod query_service;
pub mod redemption_service;

pub use balance_calculator::compute_balance;
pub use dto::*;
pub use query_service::PointsQueryService;
pub use redemption_service::RedemptionService;

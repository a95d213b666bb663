//! 积分账本领域模型
//!
//! 订单（收入事件）、兑换（支出事件）以及由二者推导出的余额快照

pub mod balance;
pub mod order;
pub mod redemption;

pub use balance::BalanceSnapshot;
pub use order::{Order, OrderStatus};
pub use redemption::Redemption;

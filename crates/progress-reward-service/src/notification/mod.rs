//! 通知模块
//!
//! - `types`: 奖励事件与通知构建
//! - `dispatcher`: 分发器 trait 及落库实现

mod dispatcher;
mod types;

pub use dispatcher::{NotificationDispatcher, StoredNotificationDispatcher};
pub use types::{NotificationBuilder, RewardEvent};

#[cfg(test)]
pub use dispatcher::MockNotificationDispatcher;

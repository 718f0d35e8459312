//! 通知分发
//!
//! 奖励协调器只依赖 `NotificationDispatcher` trait，默认实现把事件落库为站内通知。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use agrilearn_shared::observability::metrics;

use super::types::{NotificationBuilder, RewardEvent};
use crate::error::{RewardError, Result};
use crate::repository::NotificationRepositoryTrait;

/// 奖励事件分发器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &RewardEvent) -> Result<()>;
}

/// 持久化分发器：每个事件写入一条站内通知
pub struct StoredNotificationDispatcher<NR>
where
    NR: NotificationRepositoryTrait,
{
    repo: Arc<NR>,
}

impl<NR> StoredNotificationDispatcher<NR>
where
    NR: NotificationRepositoryTrait,
{
    pub fn new(repo: Arc<NR>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<NR> NotificationDispatcher for StoredNotificationDispatcher<NR>
where
    NR: NotificationRepositoryTrait + 'static,
{
    async fn dispatch(&self, event: &RewardEvent) -> Result<()> {
        let notification = NotificationBuilder::from_event(event, Utc::now());
        let kind = notification.notification_type.as_str();

        match self.repo.insert(&notification).await {
            Ok(()) => {
                metrics::record_notification(kind, "stored");
                debug!(
                    user_id = %notification.user_id,
                    notification_id = %notification.id,
                    kind,
                    "站内通知已写入"
                );
                Ok(())
            }
            Err(e) => {
                metrics::record_notification(kind, "failed");
                Err(RewardError::dependency("notification", e))
            }
        }
    }
}

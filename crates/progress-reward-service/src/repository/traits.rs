//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AchievementMetadata, Certificate, CompletedLesson, CourseProgress, Notification,
    ProgressUpdate, QuizResult, Recalculated, UserAchievement,
};

/// 学习进度仓储接口
///
/// 所有写操作都是针对单条 (user, course) 记录的原子读改写
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseProgressRepositoryTrait: Send + Sync {
    async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<CourseProgress>>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CourseProgress>>;

    /// 记录不存在时创建；完成边沿只会被一个并发调用观察到
    async fn apply_lesson_completion(
        &self,
        user_id: &str,
        course_id: &str,
        lesson: CompletedLesson,
        total_lessons: u32,
    ) -> Result<ProgressUpdate>;

    /// 记录不存在时创建
    async fn record_quiz_result(
        &self,
        user_id: &str,
        course_id: &str,
        quiz: QuizResult,
    ) -> Result<CourseProgress>;

    /// 重新计算已有记录，记录不存在时返回 NotFound
    async fn recalculate(
        &self,
        user_id: &str,
        course_id: &str,
        total_lessons: u32,
        now: DateTime<Utc>,
    ) -> Result<(CourseProgress, Recalculated)>;

    async fn mark_certificate_earned(&self, user_id: &str, course_id: &str) -> Result<()>;
}

/// 用户成就仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserAchievementRepositoryTrait: Send + Sync {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserAchievement>>;

    /// 更新未完成成就的进度快照，已解锁的记录保持不变
    async fn record_progress(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: u8,
        metadata: AchievementMetadata,
    ) -> Result<()>;

    /// 解锁成就，返回本次是否为新解锁（重复调用返回 false）
    async fn unlock(
        &self,
        user_id: &str,
        achievement_id: &str,
        metadata: AchievementMetadata,
        unlocked_at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// 证书仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRepositoryTrait: Send + Sync {
    async fn find(&self, user_id: &str, course_id: &str) -> Result<Option<Certificate>>;
    async fn find_by_certificate_id(&self, certificate_id: &str) -> Result<Option<Certificate>>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Certificate>>;

    /// (user, course) 已存在证书时返回 Conflict
    async fn insert(&self, certificate: &Certificate) -> Result<()>;

    async fn increment_download(&self, certificate_id: &str) -> Result<Certificate>;
    async fn increment_share(&self, certificate_id: &str) -> Result<Certificate>;
}

/// 站内通知仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<()>;

    /// 按创建时间倒序
    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Notification>>;

    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool>;
}

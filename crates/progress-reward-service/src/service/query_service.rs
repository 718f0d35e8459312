//! 学习者查询服务
//!
//! 只读聚合：学习统计、成就总览、证书和站内通知。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::achievement::{AchievementEvaluator, UserStats};
use crate::catalog::{AchievementCatalog, CourseCatalog};
use crate::error::{RewardError, Result};
use crate::models::{Certificate, CourseProgress, Notification, ProgressState, UserAchievement};
use crate::repository::{
    CertificateRepositoryTrait, CourseProgressRepositoryTrait, NotificationRepositoryTrait,
    UserAchievementRepositoryTrait,
};
use crate::service::dto::{AchievementOverviewDto, LearnerStatsDto};

const MAX_NOTIFICATION_PAGE: i64 = 100;

/// 学习者查询服务
pub struct LearnerQueryService<PR, AR, CR, NR>
where
    PR: CourseProgressRepositoryTrait,
    AR: UserAchievementRepositoryTrait,
    CR: CertificateRepositoryTrait,
    NR: NotificationRepositoryTrait,
{
    progress_repo: Arc<PR>,
    achievement_repo: Arc<AR>,
    certificate_repo: Arc<CR>,
    notification_repo: Arc<NR>,
    course_catalog: Arc<dyn CourseCatalog>,
    achievement_catalog: Arc<dyn AchievementCatalog>,
}

impl<PR, AR, CR, NR> LearnerQueryService<PR, AR, CR, NR>
where
    PR: CourseProgressRepositoryTrait,
    AR: UserAchievementRepositoryTrait,
    CR: CertificateRepositoryTrait,
    NR: NotificationRepositoryTrait,
{
    pub fn new(
        progress_repo: Arc<PR>,
        achievement_repo: Arc<AR>,
        certificate_repo: Arc<CR>,
        notification_repo: Arc<NR>,
        course_catalog: Arc<dyn CourseCatalog>,
        achievement_catalog: Arc<dyn AchievementCatalog>,
    ) -> Self {
        Self {
            progress_repo,
            achievement_repo,
            certificate_repo,
            notification_repo,
            course_catalog,
            achievement_catalog,
        }
    }

    /// 单门课程进度，不存在时返回 NotFound
    pub async fn course_progress(&self, user_id: &str, course_id: &str) -> Result<CourseProgress> {
        self.progress_repo
            .get(user_id, course_id)
            .await?
            .ok_or_else(|| RewardError::not_found("course_progress", format!("{user_id}/{course_id}")))
    }

    pub async fn list_progress(&self, user_id: &str) -> Result<Vec<CourseProgress>> {
        self.progress_repo.list_by_user(user_id).await
    }

    /// 学习统计
    #[instrument(skip(self))]
    pub async fn learner_stats(&self, user_id: &str) -> Result<LearnerStatsDto> {
        let (records, achievements, certificates) = futures::try_join!(
            self.progress_repo.list_by_user(user_id),
            self.achievement_repo.list_by_user(user_id),
            self.certificate_repo.list_by_user(user_id),
        )?;
        let stats = UserStats::collect(&records);

        let points = self.points_by_achievement().await?;
        let unlocked: Vec<&UserAchievement> =
            achievements.iter().filter(|a| a.is_completed).collect();
        let total_points = unlocked
            .iter()
            .filter_map(|a| points.get(&a.achievement_id))
            .map(|p| u64::from(*p))
            .sum();

        Ok(LearnerStatsDto {
            enrolled_courses: records.len() as u32,
            completed_courses: stats.completed_course_count,
            in_progress_courses: records
                .iter()
                .filter(|r| r.state() == ProgressState::InProgress)
                .count() as u32,
            total_courses: self.course_catalog.total_courses(),
            completed_lessons: records
                .iter()
                .map(|r| r.completed_lesson_count() as u32)
                .sum(),
            total_time_spent_minutes: stats.total_time_spent_minutes,
            average_quiz_score: stats.average_quiz_score,
            certificates: certificates.len() as u32,
            achievements_unlocked: unlocked.len() as u32,
            total_points,
            learning_streak_days: stats.login_streak_days,
        })
    }

    async fn points_by_achievement(&self) -> Result<HashMap<String, u32>> {
        Ok(self
            .achievement_catalog
            .list_active()
            .await?
            .into_iter()
            .map(|d| (d.id, d.points))
            .collect())
    }

    /// 成就总览
    ///
    /// 列出全部启用的成就及用户进度；已解锁的成就以持久化记录为准
    #[instrument(skip(self))]
    pub async fn achievement_overview(&self, user_id: &str) -> Result<Vec<AchievementOverviewDto>> {
        let (definitions, records, achievements) = futures::try_join!(
            self.achievement_catalog.list_active(),
            self.progress_repo.list_by_user(user_id),
            self.achievement_repo.list_by_user(user_id),
        )?;
        let stats = UserStats::collect(&records);
        let persisted: HashMap<String, UserAchievement> = achievements
            .into_iter()
            .map(|a| (a.achievement_id.clone(), a))
            .collect();
        let evaluator = AchievementEvaluator::new(self.course_catalog.course_ids());

        Ok(definitions
            .iter()
            .map(|definition| {
                let unlocked = persisted.get(&definition.id).filter(|a| a.is_completed);
                let (progress, current_value, target_value) = match unlocked {
                    Some(record) => (
                        100,
                        record.metadata.current_value,
                        record.metadata.target_value,
                    ),
                    None => {
                        let live = evaluator.progress_of(definition, &stats);
                        // 未解锁时最多显示 99，解锁以持久化记录为准
                        (live.percent.min(99), live.current, live.target)
                    }
                };

                AchievementOverviewDto {
                    achievement_id: definition.id.clone(),
                    name: definition.name.clone(),
                    description: definition.description.clone(),
                    category: definition.category(),
                    rarity: definition.rarity,
                    points: definition.points,
                    progress,
                    current_value,
                    target_value,
                    is_completed: unlocked.is_some(),
                    unlocked_at: unlocked.and_then(|a| a.unlocked_at),
                }
            })
            .collect())
    }

    pub async fn certificates(&self, user_id: &str) -> Result<Vec<Certificate>> {
        self.certificate_repo.list_by_user(user_id).await
    }

    /// 最近的站内通知，`limit` 限制在 1..=100
    pub async fn notifications(&self, user_id: &str, limit: i64) -> Result<Vec<Notification>> {
        let limit = limit.clamp(1, MAX_NOTIFICATION_PAGE);
        self.notification_repo.list_by_user(user_id, limit).await
    }

    /// 标记通知已读，通知不存在或已读时返回 false
    pub async fn mark_notification_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool> {
        self.notification_repo.mark_read(user_id, notification_id).await
    }
}

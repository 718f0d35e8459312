//! 内存仓储
//!
//! 基于 DashMap 的仓储实现，适用于本地开发和测试。
//! 单条记录的读改写在 entry 写锁内完成，与 Postgres 实现的行锁语义一致。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::traits::{
    CertificateRepositoryTrait, CourseProgressRepositoryTrait, NotificationRepositoryTrait,
    UserAchievementRepositoryTrait,
};
use crate::error::{RewardError, Result};
use crate::models::{
    AchievementMetadata, Certificate, CompletedLesson, CourseProgress, Notification,
    ProgressUpdate, QuizResult, Recalculated, UserAchievement,
};

type UserKey = (String, String);

fn key(user_id: &str, other: &str) -> UserKey {
    (user_id.to_string(), other.to_string())
}

// ==================== 学习进度 ====================

/// 内存学习进度仓储
#[derive(Debug, Clone, Default)]
pub struct MemoryCourseProgressRepository {
    data: Arc<DashMap<UserKey, CourseProgress>>,
}

impl MemoryCourseProgressRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入一条记录（用于构造历史脏数据等测试场景）
    pub fn insert(&self, progress: CourseProgress) {
        self.data
            .insert(key(&progress.user_id, &progress.course_id), progress);
    }
}

#[async_trait]
impl CourseProgressRepositoryTrait for MemoryCourseProgressRepository {
    async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<CourseProgress>> {
        Ok(self.data.get(&key(user_id, course_id)).map(|p| p.clone()))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CourseProgress>> {
        let mut records: Vec<CourseProgress> = self
            .data
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.course_id.cmp(&b.course_id))
        });
        Ok(records)
    }

    async fn apply_lesson_completion(
        &self,
        user_id: &str,
        course_id: &str,
        lesson: CompletedLesson,
        total_lessons: u32,
    ) -> Result<ProgressUpdate> {
        let at = lesson.completed_at;
        let mut entry = self
            .data
            .entry(key(user_id, course_id))
            .or_insert_with(|| CourseProgress::new(user_id, course_id, at));
        let applied = entry.apply_lesson(lesson, total_lessons);

        Ok(ProgressUpdate {
            progress: entry.clone(),
            applied,
        })
    }

    async fn record_quiz_result(
        &self,
        user_id: &str,
        course_id: &str,
        quiz: QuizResult,
    ) -> Result<CourseProgress> {
        let at = quiz.completed_at;
        let mut entry = self
            .data
            .entry(key(user_id, course_id))
            .or_insert_with(|| CourseProgress::new(user_id, course_id, at));
        entry.record_quiz(quiz);
        Ok(entry.clone())
    }

    async fn recalculate(
        &self,
        user_id: &str,
        course_id: &str,
        total_lessons: u32,
        now: DateTime<Utc>,
    ) -> Result<(CourseProgress, Recalculated)> {
        let mut entry = self
            .data
            .get_mut(&key(user_id, course_id))
            .ok_or_else(|| RewardError::not_found("course_progress", format!("{user_id}/{course_id}")))?;
        let outcome = entry.recalculate(total_lessons, now);
        Ok((entry.clone(), outcome))
    }

    async fn mark_certificate_earned(&self, user_id: &str, course_id: &str) -> Result<()> {
        if let Some(mut entry) = self.data.get_mut(&key(user_id, course_id)) {
            entry.certificate_earned = true;
        }
        Ok(())
    }
}

// ==================== 用户成就 ====================

/// 内存用户成就仓储
#[derive(Debug, Clone, Default)]
pub struct MemoryUserAchievementRepository {
    data: Arc<DashMap<UserKey, UserAchievement>>,
}

impl MemoryUserAchievementRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserAchievementRepositoryTrait for MemoryUserAchievementRepository {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        let mut records: Vec<UserAchievement> = self
            .data
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.achievement_id.cmp(&b.achievement_id));
        Ok(records)
    }

    async fn record_progress(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: u8,
        metadata: AchievementMetadata,
    ) -> Result<()> {
        let now = Utc::now();
        match self.data.entry(key(user_id, achievement_id)) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if !record.is_completed {
                    record.progress = progress.min(99);
                    record.metadata = metadata;
                    record.updated_at = now;
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(UserAchievement {
                    user_id: user_id.to_string(),
                    achievement_id: achievement_id.to_string(),
                    progress: progress.min(99),
                    is_completed: false,
                    unlocked_at: None,
                    metadata,
                    updated_at: now,
                });
            }
        }
        Ok(())
    }

    async fn unlock(
        &self,
        user_id: &str,
        achievement_id: &str,
        metadata: AchievementMetadata,
        unlocked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let unlocked = UserAchievement {
            user_id: user_id.to_string(),
            achievement_id: achievement_id.to_string(),
            progress: 100,
            is_completed: true,
            unlocked_at: Some(unlocked_at),
            metadata,
            updated_at: unlocked_at,
        };

        match self.data.entry(key(user_id, achievement_id)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_completed {
                    return Ok(false);
                }
                occupied.insert(unlocked);
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(unlocked);
                Ok(true)
            }
        }
    }
}

// ==================== 证书 ====================

/// 内存证书仓储
#[derive(Debug, Clone, Default)]
pub struct MemoryCertificateRepository {
    data: Arc<DashMap<UserKey, Certificate>>,
    /// certificate_id -> (user_id, course_id)
    by_certificate_id: Arc<DashMap<String, UserKey>>,
}

impl MemoryCertificateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    fn update_counter<F>(&self, certificate_id: &str, apply: F) -> Result<Certificate>
    where
        F: FnOnce(&mut Certificate),
    {
        let owner = self
            .by_certificate_id
            .get(certificate_id)
            .map(|k| k.clone())
            .ok_or_else(|| RewardError::not_found("certificate", certificate_id))?;
        let mut entry = self
            .data
            .get_mut(&owner)
            .ok_or_else(|| RewardError::not_found("certificate", certificate_id))?;
        apply(&mut entry);
        Ok(entry.clone())
    }
}

#[async_trait]
impl CertificateRepositoryTrait for MemoryCertificateRepository {
    async fn find(&self, user_id: &str, course_id: &str) -> Result<Option<Certificate>> {
        Ok(self.data.get(&key(user_id, course_id)).map(|c| c.clone()))
    }

    async fn find_by_certificate_id(&self, certificate_id: &str) -> Result<Option<Certificate>> {
        let Some(owner) = self.by_certificate_id.get(certificate_id).map(|k| k.clone()) else {
            return Ok(None);
        };
        Ok(self.data.get(&owner).map(|c| c.clone()))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Certificate>> {
        let mut certificates: Vec<Certificate> = self
            .data
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        certificates.sort_by(|a, b| b.issued_date.cmp(&a.issued_date));
        Ok(certificates)
    }

    async fn insert(&self, certificate: &Certificate) -> Result<()> {
        let owner = key(&certificate.user_id, &certificate.course_id);
        match self.data.entry(owner.clone()) {
            Entry::Occupied(_) => Err(RewardError::Conflict(format!(
                "证书已存在: user_id={}, course_id={}",
                certificate.user_id, certificate.course_id
            ))),
            Entry::Vacant(vacant) => {
                self.by_certificate_id
                    .insert(certificate.certificate_id.clone(), owner);
                vacant.insert(certificate.clone());
                Ok(())
            }
        }
    }

    async fn increment_download(&self, certificate_id: &str) -> Result<Certificate> {
        self.update_counter(certificate_id, |c| {
            c.download_count = c.download_count.saturating_add(1)
        })
    }

    async fn increment_share(&self, certificate_id: &str) -> Result<Certificate> {
        self.update_counter(certificate_id, |c| {
            c.share_count = c.share_count.saturating_add(1)
        })
    }
}

// ==================== 站内通知 ====================

/// 内存通知仓储
#[derive(Debug, Clone, Default)]
pub struct MemoryNotificationRepository {
    data: Arc<DashMap<String, Vec<Notification>>>,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某用户的全部通知，按写入顺序
    pub fn all_for_user(&self, user_id: &str) -> Vec<Notification> {
        self.data
            .get(user_id)
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationRepositoryTrait for MemoryNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.data
            .entry(notification.user_id.clone())
            .or_default()
            .push(notification.clone());
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Notification>> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let mut list = self.all_for_user(user_id);
        list.reverse();
        list.truncate(limit);
        Ok(list)
    }

    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool> {
        let Some(mut list) = self.data.get_mut(user_id) else {
            return Ok(false);
        };
        match list
            .iter_mut()
            .find(|n| n.id == notification_id && !n.is_read)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

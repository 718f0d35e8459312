//! 奖励事件与通知构建

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::{Notification, NotificationPriority, NotificationType, Rarity};

/// 奖励事件
///
/// 链路中每次真实发生的状态迁移对应一个事件，只携带通知所需的最少数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardEvent {
    CourseCompleted {
        user_id: String,
        course_id: String,
        course_title: String,
        /// 课程最终成绩
        score: u8,
        completed_at: DateTime<Utc>,
    },
    CertificateIssued {
        user_id: String,
        course_id: String,
        course_title: String,
        certificate_id: String,
    },
    AchievementUnlocked {
        user_id: String,
        achievement_id: String,
        name: String,
        description: String,
        points: u32,
        rarity: Rarity,
    },
}

impl RewardEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::CourseCompleted { user_id, .. }
            | Self::CertificateIssued { user_id, .. }
            | Self::AchievementUnlocked { user_id, .. } => user_id,
        }
    }

    /// 事件对应的通知类型
    pub fn kind(&self) -> NotificationType {
        match self {
            Self::CourseCompleted { .. } => NotificationType::CourseCompletion,
            Self::CertificateIssued { .. } => NotificationType::CertificateEarned,
            Self::AchievementUnlocked { .. } => NotificationType::AchievementUnlocked,
        }
    }
}

/// 通知构建器
///
/// 把奖励事件转换为可持久化的站内通知
pub struct NotificationBuilder;

impl NotificationBuilder {
    pub fn from_event(event: &RewardEvent, now: DateTime<Utc>) -> Notification {
        match event {
            RewardEvent::CourseCompleted {
                user_id,
                course_id,
                course_title,
                score,
                ..
            } => Self::course_completed(user_id, course_id, course_title, *score, now),
            RewardEvent::CertificateIssued {
                user_id,
                course_id,
                course_title,
                certificate_id,
            } => Self::certificate_issued(user_id, course_id, course_title, certificate_id, now),
            RewardEvent::AchievementUnlocked {
                user_id,
                achievement_id,
                name,
                points,
                rarity,
                ..
            } => Self::achievement_unlocked(user_id, achievement_id, name, *points, *rarity, now),
        }
    }

    /// 课程完成通知
    pub fn course_completed(
        user_id: &str,
        course_id: &str,
        course_title: &str,
        score: u8,
        now: DateTime<Utc>,
    ) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            notification_type: NotificationType::CourseCompletion,
            title: "Course Completed!".to_string(),
            message: format!(
                "Congratulations! You have successfully completed \"{}\" with a score of {}%.",
                course_title, score
            ),
            priority: NotificationPriority::High,
            data: json!({
                "courseId": course_id,
                "score": score,
                "actionUrl": format!("/courses/{}/certificate", course_id),
            }),
            is_read: false,
            created_at: now,
        }
    }

    /// 证书获得通知
    pub fn certificate_issued(
        user_id: &str,
        course_id: &str,
        course_title: &str,
        certificate_id: &str,
        now: DateTime<Utc>,
    ) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            notification_type: NotificationType::CertificateEarned,
            title: "Certificate Earned!".to_string(),
            message: format!(
                "Your certificate for completing \"{}\" is now available.",
                course_title
            ),
            priority: NotificationPriority::High,
            data: json!({
                "courseId": course_id,
                "certificateId": certificate_id,
                "actionUrl": format!("/certificates/{}", certificate_id),
            }),
            is_read: false,
            created_at: now,
        }
    }

    /// 成就解锁通知，稀有度越高优先级越高
    pub fn achievement_unlocked(
        user_id: &str,
        achievement_id: &str,
        name: &str,
        points: u32,
        rarity: Rarity,
        now: DateTime<Utc>,
    ) -> Notification {
        let priority = match rarity {
            Rarity::Common | Rarity::Uncommon => NotificationPriority::Low,
            Rarity::Rare => NotificationPriority::Medium,
            Rarity::Epic | Rarity::Legendary => NotificationPriority::High,
        };

        Notification {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            notification_type: NotificationType::AchievementUnlocked,
            title: "Achievement Unlocked!".to_string(),
            message: format!("Congratulations! You've unlocked the \"{}\" achievement.", name),
            priority,
            data: json!({
                "achievementId": achievement_id,
                "points": points,
                "rarity": rarity.as_str(),
                "actionUrl": "/achievements",
            }),
            is_read: false,
            created_at: now,
        }
    }
}

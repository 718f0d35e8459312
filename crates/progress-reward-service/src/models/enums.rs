//! 奖励链路枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 成就分类
///
/// 每个分类对应一种条件评估策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum AchievementCategory {
    /// 完成课程数
    CourseCompletion,
    /// 测验成绩
    QuizScore,
    /// 连续学习天数
    Streak,
    /// 累计学习时长
    TimeSpent,
    /// 社交类，仅支持手动解锁
    Social,
    /// 特殊活动，仅支持手动解锁
    Special,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseCompletion => "course_completion",
            Self::QuizScore => "quiz_score",
            Self::Streak => "streak",
            Self::TimeSpent => "time_spent",
            Self::Social => "social",
            Self::Special => "special",
        }
    }

    /// 是否只能由运营手动授予
    pub fn is_manual_only(&self) -> bool {
        matches!(self, Self::Social | Self::Special)
    }
}

/// 成就稀有度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum NotificationType {
    /// 课程完成
    CourseCompletion,
    /// 获得证书
    CertificateEarned,
    /// 解锁成就
    AchievementUnlocked,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseCompletion => "course_completion",
            Self::CertificateEarned => "certificate_earned",
            Self::AchievementUnlocked => "achievement_unlocked",
        }
    }
}

/// 通知优先级
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// 单门课程的学习状态
///
/// 只有 `InProgress -> Completed` 这一迁移会触发奖励
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    NotStarted,
    InProgress,
    Completed,
}

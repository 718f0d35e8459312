//! 服务层数据传输对象
//!
//! 定义服务层入口的请求与响应，与内部领域模型解耦

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AchievementCategory, AchievementDefinition, CourseProgress, Rarity};

/// 课时完成请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub lesson_title: String,
    /// 未提供时使用配置的默认课时时长
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_minutes: Option<u32>,
}

impl CompleteLessonRequest {
    pub fn new(
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        lesson_id: impl Into<String>,
        lesson_title: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            lesson_id: lesson_id.into(),
            lesson_title: lesson_title.into(),
            time_spent_minutes: None,
        }
    }

    pub fn with_time_spent(mut self, minutes: u32) -> Self {
        self.time_spent_minutes = Some(minutes);
        self
    }
}

/// 下游阶段失败记录
///
/// 阶段失败不会回滚已提交的进度，只在响应中报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailure {
    pub stage: String,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: &str, message: impl std::fmt::Display) -> Self {
        Self {
            stage: stage.to_string(),
            message: message.to_string(),
        }
    }
}

/// 新解锁的成就
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievementDto {
    pub achievement_id: String,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub rarity: Rarity,
    pub points: u32,
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedAchievementDto {
    pub fn from_definition(definition: &AchievementDefinition, unlocked_at: DateTime<Utc>) -> Self {
        Self {
            achievement_id: definition.id.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            category: definition.category(),
            rarity: definition.rarity,
            points: definition.points,
            unlocked_at,
        }
    }
}

/// 课时完成响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonResponse {
    pub overall_progress: u8,
    pub is_completed: bool,
    /// 本次调用是否触发了课程完成
    pub course_just_completed: bool,
    pub new_achievements: Vec<UnlockedAchievementDto>,
    /// 本次调用是否新颁发了证书
    pub certificate_issued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stage_failures: Vec<StageFailure>,
}

/// 测验结果请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuizRequest {
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: String,
    /// 0..=100
    pub score: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
}

/// 测验结果响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuizResponse {
    pub average_score: u8,
    pub total_quizzes: u32,
    pub new_achievements: Vec<UnlockedAchievementDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stage_failures: Vec<StageFailure>,
}

/// 成就评估和手动授予的响应
///
/// 手动授予时 `new_achievements` 最多一项，已解锁则为空
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlockResponse {
    pub new_achievements: Vec<UnlockedAchievementDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stage_failures: Vec<StageFailure>,
}

/// 补偿执行结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// 修正后的全部进度记录
    pub progress: Vec<CourseProgress>,
    /// 被修正的进度记录数
    pub corrected_records: u32,
    pub certificates_issued: Vec<String>,
    pub new_achievements: Vec<UnlockedAchievementDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stage_failures: Vec<StageFailure>,
}

/// 学习者统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerStatsDto {
    pub enrolled_courses: u32,
    pub completed_courses: u32,
    pub in_progress_courses: u32,
    pub total_courses: u32,
    pub completed_lessons: u32,
    pub total_time_spent_minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_quiz_score: Option<u8>,
    pub certificates: u32,
    pub achievements_unlocked: u32,
    pub total_points: u64,
    pub learning_streak_days: u32,
}

/// 成就总览条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementOverviewDto {
    pub achievement_id: String,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub rarity: Rarity,
    pub points: u32,
    pub progress: u8,
    pub current_value: u64,
    pub target_value: u64,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

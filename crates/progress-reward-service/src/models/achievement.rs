//! 成就定义与用户成就实体
//!
//! 成就条件是按分类区分的封闭变体，从配置中的松散 JSON 载荷解码，
//! 解码失败的定义在加载时即被拒绝，评估逻辑因此可以穷尽匹配。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::enums::{AchievementCategory, Rarity};
use crate::error::{RewardError, Result};

/// 课程完成类成就的目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseTarget {
    /// 完成指定数量的课程
    Count(u32),
    /// 完成课程目录中的全部课程
    All,
}

/// 测验类成就规则
///
/// 载荷中 `target` 的含义取决于是否同时存在 `minScore`：
/// 只有 `minScore` 为单次最高分，两者都有为高分次数，只有 `target` 为累计得分。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizRule {
    BestScore { min_score: u8 },
    HighScoreCount { target: u32, min_score: u8 },
    CumulativePoints { target: u32 },
}

/// 成就解锁条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementCondition {
    CourseCompletion {
        target: CourseTarget,
        min_average_score: Option<u8>,
    },
    QuizScore(QuizRule),
    TimeSpent {
        target_minutes: u32,
    },
    Streak {
        target: u32,
    },
    Social,
    Special,
}

impl AchievementCondition {
    pub fn category(&self) -> AchievementCategory {
        match self {
            Self::CourseCompletion { .. } => AchievementCategory::CourseCompletion,
            Self::QuizScore(_) => AchievementCategory::QuizScore,
            Self::TimeSpent { .. } => AchievementCategory::TimeSpent,
            Self::Streak { .. } => AchievementCategory::Streak,
            Self::Social => AchievementCategory::Social,
            Self::Special => AchievementCategory::Special,
        }
    }

    /// 从分类和松散的条件载荷解码
    pub fn from_payload(category: AchievementCategory, payload: &Value) -> Result<Self> {
        let empty = Map::new();
        let fields = match payload {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(RewardError::Validation(format!(
                    "成就条件必须是对象: {}",
                    other
                )));
            }
        };

        let condition = match category {
            AchievementCategory::CourseCompletion => {
                let target = match fields.get("target") {
                    Some(Value::String(s)) if s.eq_ignore_ascii_case("all") => CourseTarget::All,
                    Some(value) => CourseTarget::Count(positive_u32(value, "target")?),
                    None => {
                        return Err(RewardError::Validation(
                            "course_completion 条件缺少 target".to_string(),
                        ));
                    }
                };
                let min_average_score = fields
                    .get("minAverageScore")
                    .or_else(|| fields.get("minScore"))
                    .map(|v| score(v, "minAverageScore"))
                    .transpose()?;
                Self::CourseCompletion {
                    target,
                    min_average_score,
                }
            }
            AchievementCategory::QuizScore => {
                let target = fields
                    .get("target")
                    .map(|v| positive_u32(v, "target"))
                    .transpose()?;
                let min_score = fields
                    .get("minScore")
                    .map(|v| score(v, "minScore"))
                    .transpose()?;
                let rule = match (target, min_score) {
                    (None, Some(min_score)) => QuizRule::BestScore { min_score },
                    (Some(target), Some(min_score)) => QuizRule::HighScoreCount { target, min_score },
                    (Some(target), None) => QuizRule::CumulativePoints { target },
                    (None, None) => {
                        return Err(RewardError::Validation(
                            "quiz_score 条件至少需要 target 或 minScore".to_string(),
                        ));
                    }
                };
                Self::QuizScore(rule)
            }
            AchievementCategory::TimeSpent => {
                let value = fields.get("targetMinutes").ok_or_else(|| {
                    RewardError::Validation("time_spent 条件缺少 targetMinutes".to_string())
                })?;
                Self::TimeSpent {
                    target_minutes: positive_u32(value, "targetMinutes")?,
                }
            }
            AchievementCategory::Streak => {
                let value = fields.get("target").ok_or_else(|| {
                    RewardError::Validation("streak 条件缺少 target".to_string())
                })?;
                Self::Streak {
                    target: positive_u32(value, "target")?,
                }
            }
            AchievementCategory::Social => Self::Social,
            AchievementCategory::Special => Self::Special,
        };

        Ok(condition)
    }

    /// 编码回条件载荷（与 `from_payload` 互逆）
    pub fn to_payload(&self) -> Value {
        match self {
            Self::CourseCompletion {
                target,
                min_average_score,
            } => {
                let mut map = Map::new();
                let target = match target {
                    CourseTarget::Count(n) => json!(n),
                    CourseTarget::All => json!("all"),
                };
                map.insert("target".to_string(), target);
                if let Some(min) = min_average_score {
                    map.insert("minAverageScore".to_string(), json!(min));
                }
                Value::Object(map)
            }
            Self::QuizScore(QuizRule::BestScore { min_score }) => json!({ "minScore": min_score }),
            Self::QuizScore(QuizRule::HighScoreCount { target, min_score }) => {
                json!({ "target": target, "minScore": min_score })
            }
            Self::QuizScore(QuizRule::CumulativePoints { target }) => json!({ "target": target }),
            Self::TimeSpent { target_minutes } => json!({ "targetMinutes": target_minutes }),
            Self::Streak { target } => json!({ "target": target }),
            Self::Social | Self::Special => json!({}),
        }
    }
}

fn positive_u32(value: &Value, field: &str) -> Result<u32> {
    value
        .as_u64()
        .filter(|n| *n >= 1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RewardError::Validation(format!("{} 必须是正整数: {}", field, value)))
}

fn score(value: &Value, field: &str) -> Result<u8> {
    value
        .as_u64()
        .filter(|n| *n <= 100)
        .map(|n| n as u8)
        .ok_or_else(|| RewardError::Validation(format!("{} 必须在 0..=100: {}", field, value)))
}

/// 成就定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    try_from = "RawAchievementDefinition",
    into = "RawAchievementDefinition"
)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points: u32,
    pub rarity: Rarity,
    /// 通知和展示顺序，升序
    pub sort_order: i32,
    pub is_active: bool,
    pub condition: AchievementCondition,
}

/// 成就定义的存储形态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAchievementDefinition {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    category: AchievementCategory,
    #[serde(default)]
    conditions: Value,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    rarity: Rarity,
    #[serde(default)]
    sort_order: i32,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TryFrom<RawAchievementDefinition> for AchievementDefinition {
    type Error = RewardError;

    fn try_from(raw: RawAchievementDefinition) -> Result<Self> {
        if raw.id.trim().is_empty() {
            return Err(RewardError::Validation("成就 ID 不能为空".to_string()));
        }
        let condition = AchievementCondition::from_payload(raw.category, &raw.conditions)
            .map_err(|e| RewardError::Validation(format!("成就 {}: {}", raw.id, e)))?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            points: raw.points,
            rarity: raw.rarity,
            sort_order: raw.sort_order,
            is_active: raw.is_active,
            condition,
        })
    }
}

impl From<AchievementDefinition> for RawAchievementDefinition {
    fn from(def: AchievementDefinition) -> Self {
        Self {
            category: def.condition.category(),
            conditions: def.condition.to_payload(),
            id: def.id,
            name: def.name,
            description: def.description,
            points: def.points,
            rarity: def.rarity,
            sort_order: def.sort_order,
            is_active: def.is_active,
        }
    }
}

impl AchievementDefinition {
    pub fn category(&self) -> AchievementCategory {
        self.condition.category()
    }
}

/// 成就进度快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementMetadata {
    pub current_value: u64,
    pub target_value: u64,
}

/// 用户成就
///
/// 每个 (user, achievement) 一条；`is_completed` 一旦为 true 不再回退
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub user_id: String,
    pub achievement_id: String,
    /// 完成百分比 0..=100
    pub progress: u8,
    pub is_completed: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub metadata: AchievementMetadata,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(category: AchievementCategory, payload: Value) -> Result<AchievementCondition> {
        AchievementCondition::from_payload(category, &payload)
    }

    #[test]
    fn test_quiz_payload_disambiguation() {
        assert_eq!(
            decode(AchievementCategory::QuizScore, json!({"minScore": 100})).unwrap(),
            AchievementCondition::QuizScore(QuizRule::BestScore { min_score: 100 })
        );
        assert_eq!(
            decode(AchievementCategory::QuizScore, json!({"target": 5, "minScore": 90})).unwrap(),
            AchievementCondition::QuizScore(QuizRule::HighScoreCount {
                target: 5,
                min_score: 90
            })
        );
        assert_eq!(
            decode(AchievementCategory::QuizScore, json!({"target": 500})).unwrap(),
            AchievementCondition::QuizScore(QuizRule::CumulativePoints { target: 500 })
        );
        assert!(decode(AchievementCategory::QuizScore, json!({})).is_err());
    }

    #[test]
    fn test_course_completion_target_all_and_count() {
        assert_eq!(
            decode(AchievementCategory::CourseCompletion, json!({"target": "all"})).unwrap(),
            AchievementCondition::CourseCompletion {
                target: CourseTarget::All,
                min_average_score: None
            }
        );
        assert_eq!(
            decode(
                AchievementCategory::CourseCompletion,
                json!({"target": 10, "minScore": 80})
            )
            .unwrap(),
            AchievementCondition::CourseCompletion {
                target: CourseTarget::Count(10),
                min_average_score: Some(80)
            }
        );
        assert!(decode(AchievementCategory::CourseCompletion, json!({})).is_err());
        assert!(decode(AchievementCategory::CourseCompletion, json!({"target": 0})).is_err());
    }

    #[test]
    fn test_invalid_payloads_rejected() {
        assert!(decode(AchievementCategory::TimeSpent, json!({"target": 10})).is_err());
        assert!(decode(AchievementCategory::Streak, json!({"target": -1})).is_err());
        assert!(decode(AchievementCategory::QuizScore, json!({"minScore": 101})).is_err());
        assert!(decode(AchievementCategory::Streak, json!([1, 2])).is_err());
    }

    #[test]
    fn test_manual_categories_ignore_payload() {
        assert_eq!(
            decode(AchievementCategory::Social, Value::Null).unwrap(),
            AchievementCondition::Social
        );
        assert_eq!(
            decode(AchievementCategory::Special, json!({"anything": true})).unwrap(),
            AchievementCondition::Special
        );
    }

    #[test]
    fn test_definition_json_shape() {
        let def: AchievementDefinition = serde_json::from_value(json!({
            "id": "night-owl",
            "name": "Night Owl",
            "category": "time_spent",
            "conditions": {"targetMinutes": 180},
            "rarity": "uncommon",
            "sortOrder": 10
        }))
        .unwrap();
        assert!(def.is_active);
        assert_eq!(def.category(), AchievementCategory::TimeSpent);

        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["category"], "time_spent");
        assert_eq!(value["conditions"]["targetMinutes"], 180);
        assert_eq!(value["sortOrder"], 10);
    }

    #[test]
    fn test_definition_with_bad_conditions_fails_to_load() {
        let result = serde_json::from_value::<AchievementDefinition>(json!({
            "id": "broken",
            "name": "Broken",
            "category": "quiz_score",
            "conditions": {}
        }));
        assert!(result.is_err());
    }
}

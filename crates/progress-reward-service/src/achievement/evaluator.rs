//! 成就评估器
//!
//! 纯函数：给定用户统计和已解锁集合，返回新满足条件的成就。
//! 不做任何持久化，可以随时重跑用于对账。

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::stats::UserStats;
use crate::models::{
    AchievementCondition, AchievementDefinition, AchievementMetadata, CourseTarget, QuizRule,
};

/// 成就进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    pub current: u64,
    pub target: u64,
    /// 0..=100；只有满足条件时才为 100
    pub percent: u8,
}

impl AchievementProgress {
    pub fn metadata(&self) -> AchievementMetadata {
        AchievementMetadata {
            current_value: self.current,
            target_value: self.target,
        }
    }
}

/// 成就评估器
///
/// 持有目录中的课程 ID，`target = "all"` 只统计目录内已完成的课程
#[derive(Debug, Clone)]
pub struct AchievementEvaluator {
    catalog_courses: BTreeSet<String>,
}

impl AchievementEvaluator {
    pub fn new<I, S>(catalog_course_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog_courses: catalog_course_ids.into_iter().map(Into::into).collect(),
        }
    }

    fn catalog_total(&self) -> u64 {
        self.catalog_courses.len() as u64
    }

    /// 已完成且在目录内的课程数
    fn completed_catalog_courses(&self, stats: &UserStats) -> u64 {
        stats
            .completed_course_ids
            .intersection(&self.catalog_courses)
            .count() as u64
    }

    /// 评估新满足条件的成就
    ///
    /// 跳过未启用和已解锁的定义，结果按 sort_order 升序（相同时按 ID）
    pub fn evaluate(
        &self,
        definitions: &[AchievementDefinition],
        stats: &UserStats,
        already_unlocked: &HashSet<String>,
    ) -> Vec<AchievementDefinition> {
        let mut qualified: Vec<AchievementDefinition> = definitions
            .iter()
            .filter(|d| d.is_active && !already_unlocked.contains(&d.id))
            .filter(|d| self.qualifies(&d.condition, stats))
            .cloned()
            .collect();

        qualified.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        qualified
    }

    /// 单个条件是否满足
    pub fn qualifies(&self, condition: &AchievementCondition, stats: &UserStats) -> bool {
        match condition {
            AchievementCondition::CourseCompletion {
                target,
                min_average_score,
            } => {
                let enough_courses = match target {
                    CourseTarget::Count(n) => stats.completed_course_count >= *n,
                    // 空目录下 "all" 永不满足
                    CourseTarget::All if self.catalog_courses.is_empty() => return false,
                    CourseTarget::All => {
                        self.completed_catalog_courses(stats) >= self.catalog_total()
                    }
                };
                let score_ok = match min_average_score {
                    Some(min) => stats.average_quiz_score.is_some_and(|avg| avg >= *min),
                    None => true,
                };
                enough_courses && score_ok
            }
            AchievementCondition::QuizScore(rule) => match rule {
                QuizRule::BestScore { min_score } => {
                    stats.best_score().is_some_and(|best| best >= *min_score)
                }
                QuizRule::HighScoreCount { target, min_score } => {
                    stats.scores_at_least(*min_score) >= u64::from(*target)
                }
                QuizRule::CumulativePoints { target } => {
                    stats.cumulative_points() >= u64::from(*target)
                }
            },
            AchievementCondition::TimeSpent { target_minutes } => {
                stats.total_time_spent_minutes >= u64::from(*target_minutes)
            }
            AchievementCondition::Streak { target } => stats.login_streak_days >= *target,
            AchievementCondition::Social | AchievementCondition::Special => false,
        }
    }

    /// 计算成就当前进度，用于进度展示和用户成就元数据
    pub fn progress_of(
        &self,
        definition: &AchievementDefinition,
        stats: &UserStats,
    ) -> AchievementProgress {
        let (current, target) = match &definition.condition {
            AchievementCondition::CourseCompletion { target, .. } => match target {
                CourseTarget::Count(n) => (u64::from(stats.completed_course_count), u64::from(*n)),
                CourseTarget::All => (self.completed_catalog_courses(stats), self.catalog_total()),
            },
            AchievementCondition::QuizScore(QuizRule::BestScore { min_score }) => (
                u64::from(stats.best_score().unwrap_or(0)),
                u64::from(*min_score),
            ),
            AchievementCondition::QuizScore(QuizRule::HighScoreCount { target, min_score }) => {
                (stats.scores_at_least(*min_score), u64::from(*target))
            }
            AchievementCondition::QuizScore(QuizRule::CumulativePoints { target }) => {
                (stats.cumulative_points(), u64::from(*target))
            }
            AchievementCondition::TimeSpent { target_minutes } => {
                (stats.total_time_spent_minutes, u64::from(*target_minutes))
            }
            AchievementCondition::Streak { target } => {
                (u64::from(stats.login_streak_days), u64::from(*target))
            }
            AchievementCondition::Social | AchievementCondition::Special => (0, 1),
        };

        let percent = if self.qualifies(&definition.condition, stats) {
            100
        } else if target == 0 {
            0
        } else {
            (current.saturating_mul(100) / target).min(99) as u8
        };

        AchievementProgress {
            current,
            target,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::ScoreRecord;
    use crate::catalog::seed::cacao_achievements;
    use crate::models::Rarity;
    use chrono::Utc;

    fn def(id: &str, sort_order: i32, condition: AchievementCondition) -> AchievementDefinition {
        AchievementDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            points: 10,
            rarity: Rarity::Common,
            sort_order,
            is_active: true,
            condition,
        }
    }

    fn stats_with_scores(scores: &[u8]) -> UserStats {
        let quiz_scores: Vec<ScoreRecord> = scores
            .iter()
            .map(|s| ScoreRecord {
                score: *s,
                achieved_at: Utc::now(),
            })
            .collect();
        UserStats {
            quiz_scores,
            ..Default::default()
        }
    }

    fn catalog(n: usize) -> AchievementEvaluator {
        AchievementEvaluator::new((0..n).map(|i| format!("course-{i}")))
    }

    fn completed(ids: &[&str]) -> UserStats {
        UserStats {
            completed_course_count: ids.len() as u32,
            completed_course_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn courses(n: u32) -> AchievementCondition {
        AchievementCondition::CourseCompletion {
            target: CourseTarget::Count(n),
            min_average_score: None,
        }
    }

    #[test]
    fn test_course_completion_count_and_all() {
        let evaluator = catalog(3);
        let stats = completed(&["course-0", "course-1"]);
        assert!(evaluator.qualifies(&courses(2), &stats));
        assert!(!evaluator.qualifies(&courses(3), &stats));

        let all = AchievementCondition::CourseCompletion {
            target: CourseTarget::All,
            min_average_score: None,
        };
        assert!(!evaluator.qualifies(&all, &stats));
        let done = completed(&["course-0", "course-1", "course-2"]);
        assert!(evaluator.qualifies(&all, &done));
    }

    #[test]
    fn test_all_ignores_courses_outside_catalog() {
        let evaluator = catalog(2);
        let all = AchievementCondition::CourseCompletion {
            target: CourseTarget::All,
            min_average_score: None,
        };
        let stats = completed(&["course-0", "legacy-a", "legacy-b"]);
        // 计数类目标仍统计全部已完成课程
        assert!(evaluator.qualifies(&courses(3), &stats));
        assert!(!evaluator.qualifies(&all, &stats));

        let progress = evaluator.progress_of(&def("all", 1, all), &stats);
        assert_eq!((progress.current, progress.target), (1, 2));
        assert_eq!(progress.percent, 50);

        let done = completed(&["course-0", "course-1", "legacy-a"]);
        assert!(evaluator.qualifies(&all, &done));
    }

    #[test]
    fn test_all_never_qualifies_on_empty_catalog() {
        let evaluator = catalog(0);
        let all = AchievementCondition::CourseCompletion {
            target: CourseTarget::All,
            min_average_score: None,
        };
        assert!(!evaluator.qualifies(&all, &UserStats::default()));
        assert!(!evaluator.qualifies(&all, &completed(&["legacy-a"])));
    }

    #[test]
    fn test_course_completion_with_min_average() {
        let evaluator = catalog(8);
        let condition = AchievementCondition::CourseCompletion {
            target: CourseTarget::Count(1),
            min_average_score: Some(80),
        };
        let mut stats = stats_with_scores(&[70, 80]);
        stats.completed_course_count = 1;
        stats.average_quiz_score = Some(75);
        assert!(!evaluator.qualifies(&condition, &stats));
        stats.average_quiz_score = Some(85);
        assert!(evaluator.qualifies(&condition, &stats));

        let no_quiz = UserStats {
            completed_course_count: 5,
            ..Default::default()
        };
        assert!(!evaluator.qualifies(&condition, &no_quiz));
    }

    #[test]
    fn test_quiz_rules_are_distinct() {
        let evaluator = catalog(8);
        let stats = stats_with_scores(&[90, 95, 60]);

        let best = AchievementCondition::QuizScore(QuizRule::BestScore { min_score: 95 });
        let count = AchievementCondition::QuizScore(QuizRule::HighScoreCount {
            target: 3,
            min_score: 90,
        });
        let sum = AchievementCondition::QuizScore(QuizRule::CumulativePoints { target: 245 });

        assert!(evaluator.qualifies(&best, &stats));
        // 只有两次 >= 90
        assert!(!evaluator.qualifies(&count, &stats));
        assert!(evaluator.qualifies(&sum, &stats));
    }

    #[test]
    fn test_min_score_100_needs_exact_100() {
        let evaluator = catalog(8);
        let condition = AchievementCondition::QuizScore(QuizRule::BestScore { min_score: 100 });
        assert!(!evaluator.qualifies(&condition, &stats_with_scores(&[99, 98])));
        assert!(evaluator.qualifies(&condition, &stats_with_scores(&[99, 100])));
    }

    #[test]
    fn test_time_streak_and_manual_categories() {
        let evaluator = catalog(8);
        let stats = UserStats {
            total_time_spent_minutes: 180,
            login_streak_days: 6,
            ..Default::default()
        };
        assert!(evaluator.qualifies(&AchievementCondition::TimeSpent { target_minutes: 180 }, &stats));
        assert!(!evaluator.qualifies(&AchievementCondition::Streak { target: 7 }, &stats));
        assert!(!evaluator.qualifies(&AchievementCondition::Social, &stats));
        assert!(!evaluator.qualifies(&AchievementCondition::Special, &stats));
    }

    #[test]
    fn test_evaluate_skips_unlocked_and_inactive_and_sorts() {
        let evaluator = catalog(8);
        let mut inactive = def("inactive", 0, courses(1));
        inactive.is_active = false;
        let definitions = vec![
            def("second", 5, courses(1)),
            def("first", 1, courses(1)),
            def("tie-b", 3, courses(1)),
            def("tie-a", 3, courses(1)),
            def("unlocked", 2, courses(1)),
            inactive,
        ];
        let stats = UserStats {
            completed_course_count: 1,
            ..Default::default()
        };
        let unlocked: HashSet<String> = ["unlocked".to_string()].into_iter().collect();

        let ids: Vec<String> = evaluator
            .evaluate(&definitions, &stats, &unlocked)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["first", "tie-a", "tie-b", "second"]);
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let evaluator = catalog(8);
        let definitions = cacao_achievements();
        let stats = UserStats {
            completed_course_count: 2,
            ..Default::default()
        };
        let first = evaluator.evaluate(&definitions, &stats, &HashSet::new());
        let unlocked: HashSet<String> = first.iter().map(|d| d.id.clone()).collect();
        assert_eq!(
            unlocked,
            ["first-steps", "quick-learner"]
                .iter()
                .map(|s| s.to_string())
                .collect::<HashSet<String>>()
        );
        assert!(evaluator.evaluate(&definitions, &stats, &unlocked).is_empty());
    }

    #[test]
    fn test_progress_of() {
        let evaluator = catalog(8);
        let stats = UserStats {
            completed_course_count: 2,
            ..Default::default()
        };
        let progress = evaluator.progress_of(&def("five", 1, courses(5)), &stats);
        assert_eq!(progress.current, 2);
        assert_eq!(progress.target, 5);
        assert_eq!(progress.percent, 40);
        assert_eq!(progress.metadata().target_value, 5);

        let done = evaluator.progress_of(&def("two", 1, courses(2)), &stats);
        assert_eq!(done.percent, 100);

        let manual = evaluator.progress_of(&def("social", 1, AchievementCondition::Social), &stats);
        assert_eq!(manual.percent, 0);
    }
}

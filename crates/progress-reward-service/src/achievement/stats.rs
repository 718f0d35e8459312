//! 用户累计统计
//!
//! 从用户所有课程的进度记录聚合出成就评估所需的输入。

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CourseProgress, rounded_average};

/// 单次测验得分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub score: u8,
    pub achieved_at: DateTime<Utc>,
}

/// 成就评估输入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub completed_course_count: u32,
    /// 已完成课程的 ID，按目录过滤后用于 "all" 类成就
    pub completed_course_ids: BTreeSet<String>,
    pub quiz_scores: Vec<ScoreRecord>,
    pub total_time_spent_minutes: u64,
    /// 最长连续学习天数（UTC 自然日，有课时或测验记录即算一天）
    pub login_streak_days: u32,
    /// 全部测验的平均分，无测验时为 None
    pub average_quiz_score: Option<u8>,
}

impl UserStats {
    /// 聚合用户的全部进度记录
    pub fn collect(records: &[CourseProgress]) -> Self {
        let completed_course_ids: BTreeSet<String> = records
            .iter()
            .filter(|r| r.is_completed)
            .map(|r| r.course_id.clone())
            .collect();

        let mut quiz_scores: Vec<ScoreRecord> = records
            .iter()
            .flat_map(|r| r.quiz_results.iter())
            .map(|q| ScoreRecord {
                score: q.score,
                achieved_at: q.completed_at,
            })
            .collect();
        quiz_scores.sort_by_key(|s| s.achieved_at);

        let total_time_spent_minutes = records
            .iter()
            .map(|r| u64::from(r.total_time_spent_minutes))
            .sum();

        let activity_days: BTreeSet<NaiveDate> = records
            .iter()
            .flat_map(|r| {
                r.completed_lessons
                    .iter()
                    .map(|l| l.completed_at)
                    .chain(r.quiz_results.iter().map(|q| q.completed_at))
            })
            .map(|at| at.date_naive())
            .collect();

        let average_quiz_score = if quiz_scores.is_empty() {
            None
        } else {
            Some(rounded_average(quiz_scores.iter().map(|s| s.score)))
        };

        Self {
            completed_course_count: completed_course_ids.len() as u32,
            completed_course_ids,
            quiz_scores,
            total_time_spent_minutes,
            login_streak_days: longest_streak(&activity_days),
            average_quiz_score,
        }
    }

    pub fn best_score(&self) -> Option<u8> {
        self.quiz_scores.iter().map(|s| s.score).max()
    }

    pub fn scores_at_least(&self, min_score: u8) -> u64 {
        self.quiz_scores.iter().filter(|s| s.score >= min_score).count() as u64
    }

    pub fn cumulative_points(&self) -> u64 {
        self.quiz_scores.iter().map(|s| u64::from(s.score)).sum()
    }
}

/// 有序日期集合中最长的连续天数
fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0u32;
    let mut current = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        current = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(*day);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletedLesson, QuizResult};
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap() + Duration::days(n)
    }

    fn record(course: &str, lesson_days: &[i64], quizzes: &[(u8, i64)], completed: bool) -> CourseProgress {
        let mut progress = CourseProgress::new("u1", course, day(0));
        for (i, d) in lesson_days.iter().enumerate() {
            progress.completed_lessons.push(CompletedLesson {
                lesson_id: format!("{course}-{i}"),
                title: String::new(),
                completed_at: day(*d),
                time_spent_minutes: 30,
            });
            progress.total_time_spent_minutes += 30;
        }
        for (score, d) in quizzes {
            progress.quiz_results.push(QuizResult {
                lesson_id: "quiz".to_string(),
                score: *score,
                total_questions: 10,
                correct_answers: 0,
                completed_at: day(*d),
            });
        }
        progress.is_completed = completed;
        progress
    }

    #[test]
    fn test_collect_aggregates_across_courses() {
        let records = vec![
            record("a", &[0, 1], &[(80, 1)], true),
            record("b", &[2], &[(100, 2), (60, 5)], false),
        ];
        let stats = UserStats::collect(&records);
        assert_eq!(stats.completed_course_count, 1);
        assert!(stats.completed_course_ids.contains("a"));
        assert_eq!(stats.quiz_scores.len(), 3);
        assert_eq!(stats.total_time_spent_minutes, 90);
        assert_eq!(stats.best_score(), Some(100));
        assert_eq!(stats.scores_at_least(80), 2);
        assert_eq!(stats.cumulative_points(), 240);
        assert_eq!(stats.average_quiz_score, Some(80));
        // 第 0、1、2 天连续，第 5 天断开
        assert_eq!(stats.login_streak_days, 3);
    }

    #[test]
    fn test_empty_records() {
        let stats = UserStats::collect(&[]);
        assert_eq!(stats, UserStats::default());
        assert_eq!(stats.best_score(), None);
    }

    #[test]
    fn test_longest_streak_picks_longest_run() {
        let days: BTreeSet<NaiveDate> = [0, 1, 3, 4, 5, 6, 9]
            .iter()
            .map(|d| day(*d).date_naive())
            .collect();
        assert_eq!(longest_streak(&days), 4);
        assert_eq!(longest_streak(&BTreeSet::new()), 0);
    }

    #[test]
    fn test_same_day_activity_counts_once() {
        let records = vec![record("a", &[0, 0, 0], &[(50, 0)], false)];
        assert_eq!(UserStats::collect(&records).login_streak_days, 1);
    }
}

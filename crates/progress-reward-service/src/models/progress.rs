//! 学习进度实体
//!
//! 每个 (user, course) 对应一条进度记录，首次完成课时时创建，不会删除。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ProgressState;

/// 已完成的课时
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLesson {
    pub lesson_id: String,
    pub title: String,
    pub completed_at: DateTime<Utc>,
    pub time_spent_minutes: u32,
}

/// 测验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub lesson_id: String,
    /// 得分 0..=100
    pub score: u8,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub completed_at: DateTime<Utc>,
}

/// 课程学习进度
///
/// 不变量：`overall_progress == 100` 当且仅当 `is_completed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub user_id: String,
    pub course_id: String,
    /// 按完成顺序保存，便于审计
    pub completed_lessons: Vec<CompletedLesson>,
    pub overall_progress: u8,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub certificate_earned: bool,
    pub average_score: u8,
    pub total_time_spent_minutes: u32,
    pub quiz_results: Vec<QuizResult>,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

/// 单次课时完成的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LessonApplied {
    /// 是否新增了课时（重复提交为 false）
    pub lesson_added: bool,
    /// 本次调用是否把课程从未完成翻转为已完成
    pub completion_edge: bool,
}

/// 课时完成后的进度与边沿信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress: CourseProgress,
    pub applied: LessonApplied,
}

/// 重新计算的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Recalculated {
    /// 记录是否被修正
    pub changed: bool,
    /// 修正是否把课程从未完成翻转为已完成
    pub completion_edge: bool,
}

/// 计算课程完成百分比
///
/// 四舍五入；课时数达到总数时恰好为 100，未达到时最多 99，
/// 保证任意课时总数下 100% 与完成状态一致。
pub fn compute_overall_progress(completed: usize, total_lessons: u32) -> u8 {
    let total = u64::from(total_lessons.max(1));
    let completed = completed as u64;
    if completed >= total {
        return 100;
    }
    let rounded = (completed * 200 + total) / (total * 2);
    rounded.min(99) as u8
}

/// 整数平均分（四舍五入），无成绩时为 0
pub fn rounded_average(scores: impl IntoIterator<Item = u8>) -> u8 {
    let (sum, count) = scores
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), s| (sum + u64::from(s), count + 1));
    if count == 0 {
        return 0;
    }
    ((sum * 2 + count) / (count * 2)).min(100) as u8
}

impl CourseProgress {
    pub fn new(user_id: impl Into<String>, course_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            completed_lessons: Vec::new(),
            overall_progress: 0,
            is_completed: false,
            completed_at: None,
            certificate_earned: false,
            average_score: 0,
            total_time_spent_minutes: 0,
            quiz_results: Vec::new(),
            enrolled_at: now,
            last_accessed_at: now,
        }
    }

    pub fn has_lesson(&self, lesson_id: &str) -> bool {
        self.completed_lessons.iter().any(|l| l.lesson_id == lesson_id)
    }

    pub fn completed_lesson_count(&self) -> usize {
        self.completed_lessons.len()
    }

    pub fn state(&self) -> ProgressState {
        if self.is_completed {
            ProgressState::Completed
        } else if self.completed_lessons.is_empty() && self.quiz_results.is_empty() {
            ProgressState::NotStarted
        } else {
            ProgressState::InProgress
        }
    }

    /// 应用一次课时完成
    ///
    /// 已完成的课时直接返回，不修改任何字段。
    /// 完成度只增不减；已完成的课程保持 100。
    pub fn apply_lesson(&mut self, lesson: CompletedLesson, total_lessons: u32) -> LessonApplied {
        if self.has_lesson(&lesson.lesson_id) {
            return LessonApplied::default();
        }

        let at = lesson.completed_at;
        self.total_time_spent_minutes = self
            .total_time_spent_minutes
            .saturating_add(lesson.time_spent_minutes);
        self.completed_lessons.push(lesson);
        self.last_accessed_at = self.last_accessed_at.max(at);

        if self.is_completed {
            return LessonApplied {
                lesson_added: true,
                completion_edge: false,
            };
        }

        let computed = compute_overall_progress(self.completed_lessons.len(), total_lessons);
        if computed == 100 {
            self.overall_progress = 100;
            self.is_completed = true;
            self.completed_at = Some(at);
            return LessonApplied {
                lesson_added: true,
                completion_edge: true,
            };
        }

        self.overall_progress = self.overall_progress.max(computed).min(99);
        LessonApplied {
            lesson_added: true,
            completion_edge: false,
        }
    }

    /// 按课程目录重新计算完成度
    ///
    /// 可以下调错误的历史值，也可以设置或清除完成状态；多次执行结果一致。
    pub fn recalculate(&mut self, total_lessons: u32, now: DateTime<Utc>) -> Recalculated {
        let before = (
            self.overall_progress,
            self.is_completed,
            self.completed_at,
            self.average_score,
        );

        let computed = compute_overall_progress(self.completed_lessons.len(), total_lessons);
        let complete = computed == 100;
        let completion_edge = complete && !self.is_completed;

        self.overall_progress = computed;
        if complete {
            if self.completed_at.is_none() {
                let last_lesson_at = self.completed_lessons.iter().map(|l| l.completed_at).max();
                self.completed_at = Some(last_lesson_at.unwrap_or(now));
            }
            self.is_completed = true;
        } else {
            self.is_completed = false;
            self.completed_at = None;
        }
        self.average_score = rounded_average(self.quiz_results.iter().map(|q| q.score));

        let after = (
            self.overall_progress,
            self.is_completed,
            self.completed_at,
            self.average_score,
        );
        Recalculated {
            changed: before != after,
            completion_edge,
        }
    }

    /// 记录测验结果并更新平均分，不影响完成度
    pub fn record_quiz(&mut self, quiz: QuizResult) {
        self.last_accessed_at = self.last_accessed_at.max(quiz.completed_at);
        self.quiz_results.push(quiz);
        self.average_score = rounded_average(self.quiz_results.iter().map(|q| q.score));
    }

    /// 最终成绩：有测验时取平均分，否则为 100
    pub fn final_score(&self) -> u8 {
        if self.quiz_results.is_empty() {
            100
        } else {
            self.average_score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn lesson(id: &str, at: DateTime<Utc>) -> CompletedLesson {
        CompletedLesson {
            lesson_id: id.to_string(),
            title: id.to_string(),
            completed_at: at,
            time_spent_minutes: 30,
        }
    }

    fn quiz(score: u8, at: DateTime<Utc>) -> QuizResult {
        QuizResult {
            lesson_id: "quiz".to_string(),
            score,
            total_questions: 10,
            correct_answers: u32::from(score) / 10,
            completed_at: at,
        }
    }

    #[test]
    fn test_compute_overall_progress_rounding() {
        assert_eq!(compute_overall_progress(0, 3), 0);
        assert_eq!(compute_overall_progress(1, 3), 33);
        assert_eq!(compute_overall_progress(2, 3), 67);
        assert_eq!(compute_overall_progress(3, 3), 100);
        assert_eq!(compute_overall_progress(5, 3), 100);
        assert_eq!(compute_overall_progress(1, 8), 13);
    }

    #[test]
    fn test_compute_overall_progress_never_100_before_all_lessons() {
        for total in 1..=400u32 {
            for n in 0..total as usize {
                assert!(compute_overall_progress(n, total) <= 99, "n={n}, total={total}");
            }
            assert_eq!(compute_overall_progress(total as usize, total), 100);
        }
    }

    #[test]
    fn test_compute_overall_progress_zero_total_treated_as_one() {
        assert_eq!(compute_overall_progress(0, 0), 0);
        assert_eq!(compute_overall_progress(1, 0), 100);
    }

    #[test]
    fn test_apply_lesson_edge_fires_once() {
        let now = Utc::now();
        let mut progress = CourseProgress::new("u1", "gap-practices", now);

        let first = progress.apply_lesson(lesson("gap-principles", now), 3);
        assert!(first.lesson_added && !first.completion_edge);
        progress.apply_lesson(lesson("benefits-gap", now), 3);
        assert_eq!(progress.overall_progress, 67);
        assert_eq!(progress.state(), ProgressState::InProgress);

        let last = progress.apply_lesson(lesson("regulatory-framework", now), 3);
        assert!(last.completion_edge);
        assert_eq!(progress.overall_progress, 100);
        assert!(progress.is_completed);
        assert_eq!(progress.completed_at, Some(now));
        assert_eq!(progress.total_time_spent_minutes, 90);

        let repeat = progress.apply_lesson(lesson("regulatory-framework", now), 3);
        assert_eq!(repeat, LessonApplied::default());
        assert_eq!(progress.completed_lesson_count(), 3);
    }

    #[test]
    fn test_apply_lesson_never_lowers_persisted_progress() {
        let now = Utc::now();
        let mut progress = CourseProgress::new("u1", "c", now);
        progress.overall_progress = 80;
        progress.apply_lesson(lesson("a", now), 4);
        assert_eq!(progress.overall_progress, 80);
    }

    #[test]
    fn test_recalculate_lowers_and_clears_bad_values() {
        let now = Utc::now();
        let mut progress = CourseProgress::new("u1", "c", now);
        progress.apply_lesson(lesson("a", now), 4);
        progress.overall_progress = 100;
        progress.is_completed = true;
        progress.completed_at = Some(now);

        let outcome = progress.recalculate(4, now);
        assert!(outcome.changed);
        assert!(!outcome.completion_edge);
        assert_eq!(progress.overall_progress, 25);
        assert!(!progress.is_completed);
        assert!(progress.completed_at.is_none());

        let again = progress.recalculate(4, now);
        assert!(!again.changed);
    }

    #[test]
    fn test_recalculate_detects_missed_completion() {
        let start = Utc::now();
        let mut progress = CourseProgress::new("u1", "c", start);
        progress.completed_lessons.push(lesson("a", start));
        progress.completed_lessons.push(lesson("b", start + Duration::hours(2)));
        progress.overall_progress = 50;

        let outcome = progress.recalculate(2, start + Duration::days(1));
        assert!(outcome.completion_edge);
        assert!(progress.is_completed);
        assert_eq!(progress.completed_at, Some(start + Duration::hours(2)));
    }

    #[test]
    fn test_record_quiz_average_and_final_score() {
        let now = Utc::now();
        let mut progress = CourseProgress::new("u1", "c", now);
        assert_eq!(progress.final_score(), 100);

        progress.record_quiz(quiz(80, now));
        progress.record_quiz(quiz(95, now));
        assert_eq!(progress.average_score, 88);
        assert_eq!(progress.final_score(), 88);
        assert_eq!(progress.overall_progress, 0);
        assert_eq!(progress.state(), ProgressState::InProgress);
    }

    #[test]
    fn test_rounded_average() {
        assert_eq!(rounded_average(Vec::<u8>::new()), 0);
        assert_eq!(rounded_average([100]), 100);
        assert_eq!(rounded_average([70, 71]), 71);
        assert_eq!(rounded_average([33, 33, 34]), 33);
    }
}

//! 学习进度服务
//!
//! 在仓储之上做请求校验和课程目录查询：
//! - 已知课程只接受目录中的课时 ID，未知课程使用默认课时数
//! - 校验全部在写入之前完成，校验失败不会产生任何修改

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::catalog::CourseCatalog;
use crate::error::{RewardError, Result};
use crate::models::{CompletedLesson, CourseProgress, ProgressUpdate, QuizResult, Recalculated};
use crate::repository::CourseProgressRepositoryTrait;
use crate::service::dto::{CompleteLessonRequest, RecordQuizRequest};

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RewardError::Validation(format!("{} 不能为空", field)));
    }
    Ok(())
}

/// 学习进度服务
pub struct ProgressStore<PR>
where
    PR: CourseProgressRepositoryTrait,
{
    repo: Arc<PR>,
    catalog: Arc<dyn CourseCatalog>,
    default_lesson_minutes: u32,
}

impl<PR> ProgressStore<PR>
where
    PR: CourseProgressRepositoryTrait,
{
    pub fn new(repo: Arc<PR>, catalog: Arc<dyn CourseCatalog>, default_lesson_minutes: u32) -> Self {
        Self {
            repo,
            catalog,
            default_lesson_minutes,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn CourseCatalog> {
        &self.catalog
    }

    /// 课程总课时数（未知课程为默认值）
    pub fn total_lessons(&self, course_id: &str) -> u32 {
        self.catalog.lesson_count(course_id)
    }

    /// 课程标题，未知课程使用课程 ID
    pub fn course_title(&self, course_id: &str) -> String {
        self.catalog
            .course(course_id)
            .map(|c| c.title().to_string())
            .unwrap_or_else(|| course_id.to_string())
    }

    /// 校验课时属于课程，返回课程总课时数
    fn validate_lesson(&self, course_id: &str, lesson_id: &str) -> Result<u32> {
        match self.catalog.course(course_id) {
            Some(course) if !course.contains_lesson(lesson_id) => Err(RewardError::Validation(
                format!("课时 {} 不属于课程 {}", lesson_id, course_id),
            )),
            Some(course) => Ok(course.total_lessons()),
            None => {
                debug!(course_id, "课程不在目录中，使用默认课时数");
                Ok(self.catalog.lesson_count(course_id))
            }
        }
    }

    /// 应用课时完成
    ///
    /// 记录不存在时创建；同一课时重复提交返回当前状态
    #[instrument(skip(self, request), fields(user_id = %request.user_id, course_id = %request.course_id))]
    pub async fn apply_lesson_completion(
        &self,
        request: &CompleteLessonRequest,
        now: DateTime<Utc>,
    ) -> Result<ProgressUpdate> {
        require_non_blank("user_id", &request.user_id)?;
        require_non_blank("course_id", &request.course_id)?;
        require_non_blank("lesson_id", &request.lesson_id)?;
        let total_lessons = self.validate_lesson(&request.course_id, &request.lesson_id)?;

        let lesson = CompletedLesson {
            lesson_id: request.lesson_id.clone(),
            title: request.lesson_title.clone(),
            completed_at: now,
            time_spent_minutes: request
                .time_spent_minutes
                .unwrap_or(self.default_lesson_minutes),
        };

        let update = self
            .repo
            .apply_lesson_completion(&request.user_id, &request.course_id, lesson, total_lessons)
            .await?;

        debug!(
            lesson_id = %request.lesson_id,
            lesson_added = update.applied.lesson_added,
            completion_edge = update.applied.completion_edge,
            overall_progress = update.progress.overall_progress,
            "课时完成已应用"
        );
        Ok(update)
    }

    /// 记录测验结果
    #[instrument(skip(self, request), fields(user_id = %request.user_id, course_id = %request.course_id))]
    pub async fn record_quiz_result(
        &self,
        request: &RecordQuizRequest,
        now: DateTime<Utc>,
    ) -> Result<CourseProgress> {
        require_non_blank("user_id", &request.user_id)?;
        require_non_blank("course_id", &request.course_id)?;
        require_non_blank("lesson_id", &request.lesson_id)?;
        self.validate_lesson(&request.course_id, &request.lesson_id)?;

        let score = u8::try_from(request.score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or_else(|| {
                RewardError::Validation(format!("测验分数必须在 0..=100: {}", request.score))
            })?;
        if request.total_questions == 0 {
            return Err(RewardError::Validation("测验题目数必须大于 0".to_string()));
        }
        if request.correct_answers > request.total_questions {
            return Err(RewardError::Validation(format!(
                "答对题数 {} 超过题目数 {}",
                request.correct_answers, request.total_questions
            )));
        }

        let quiz = QuizResult {
            lesson_id: request.lesson_id.clone(),
            score,
            total_questions: request.total_questions,
            correct_answers: request.correct_answers,
            completed_at: now,
        };
        self.repo
            .record_quiz_result(&request.user_id, &request.course_id, quiz)
            .await
    }

    /// 按课程目录重新计算用户全部课程
    ///
    /// 返回每条记录修正后的状态及修正结果，多次执行结果一致
    #[instrument(skip(self))]
    pub async fn recalculate(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<(CourseProgress, Recalculated)>> {
        require_non_blank("user_id", user_id)?;

        let records = self.repo.list_by_user(user_id).await?;
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let total_lessons = self.total_lessons(&record.course_id);
            let (progress, outcome) = self
                .repo
                .recalculate(user_id, &record.course_id, total_lessons, now)
                .await?;
            if outcome.changed {
                info!(
                    course_id = %progress.course_id,
                    overall_progress = progress.overall_progress,
                    is_completed = progress.is_completed,
                    "进度记录已按目录修正"
                );
            }
            results.push((progress, outcome));
        }
        Ok(results)
    }

    pub async fn mark_certificate_earned(&self, user_id: &str, course_id: &str) -> Result<()> {
        self.repo.mark_certificate_earned(user_id, course_id).await
    }

    pub async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<CourseProgress>> {
        self.repo.get(user_id, course_id).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<CourseProgress>> {
        self.repo.list_by_user(user_id).await
    }
}

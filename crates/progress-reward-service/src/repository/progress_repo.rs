//! 学习进度仓储
//!
//! 课时和测验记录以 JSONB 保存在进度行内。所有写操作在事务中先
//! `FOR UPDATE` 锁定行再读改写，完成边沿通过条件更新
//! `WHERE is_completed = false` 落库，0 行受影响即视为并发冲突。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use super::traits::CourseProgressRepositoryTrait;
use crate::error::{RewardError, Result};
use crate::models::{
    CompletedLesson, CourseProgress, ProgressUpdate, QuizResult, Recalculated,
};

const SELECT_COLUMNS: &str = r#"
    SELECT user_id, course_id, completed_lessons, overall_progress, is_completed,
           completed_at, certificate_earned, average_score, total_time_spent_minutes,
           quiz_results, enrolled_at, last_accessed_at
    FROM course_progress
"#;

const UPDATE_PROGRESS: &str = r#"
    UPDATE course_progress
    SET completed_lessons = $3, overall_progress = $4, is_completed = $5, completed_at = $6,
        average_score = $7, total_time_spent_minutes = $8, quiz_results = $9,
        last_accessed_at = $10, updated_at = NOW()
    WHERE user_id = $1 AND course_id = $2
"#;

/// 只在课程尚未完成时生效，用于完成边沿
const UPDATE_PROGRESS_ON_EDGE: &str = r#"
    UPDATE course_progress
    SET completed_lessons = $3, overall_progress = $4, is_completed = $5, completed_at = $6,
        average_score = $7, total_time_spent_minutes = $8, quiz_results = $9,
        last_accessed_at = $10, updated_at = NOW()
    WHERE user_id = $1 AND course_id = $2 AND is_completed = FALSE
"#;

/// 数据库行
#[derive(sqlx::FromRow)]
struct ProgressRow {
    user_id: String,
    course_id: String,
    completed_lessons: Json<Vec<CompletedLesson>>,
    overall_progress: i16,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    certificate_earned: bool,
    average_score: i16,
    total_time_spent_minutes: i32,
    quiz_results: Json<Vec<QuizResult>>,
    enrolled_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

impl From<ProgressRow> for CourseProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            user_id: row.user_id,
            course_id: row.course_id,
            completed_lessons: row.completed_lessons.0,
            overall_progress: percent_from_db(row.overall_progress),
            is_completed: row.is_completed,
            completed_at: row.completed_at,
            certificate_earned: row.certificate_earned,
            average_score: percent_from_db(row.average_score),
            total_time_spent_minutes: row.total_time_spent_minutes.max(0) as u32,
            quiz_results: row.quiz_results.0,
            enrolled_at: row.enrolled_at,
            last_accessed_at: row.last_accessed_at,
        }
    }
}

pub(crate) fn percent_from_db(value: i16) -> u8 {
    value.clamp(0, 100) as u8
}

pub(crate) fn count_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// 学习进度仓储
pub struct CourseProgressRepository {
    pool: PgPool,
}

impl CourseProgressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务操作 ====================

    /// 记录不存在时插入空进度
    async fn ensure_row(
        conn: &mut PgConnection,
        user_id: &str,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO course_progress (user_id, course_id, enrolled_at, last_accessed_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// 在事务中获取进度（带行级锁）
    async fn get_for_update(
        conn: &mut PgConnection,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<CourseProgress>> {
        let sql = format!(
            "{} WHERE user_id = $1 AND course_id = $2 FOR UPDATE",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(conn)
            .await?;

        Ok(row.map(CourseProgress::from))
    }

    /// 写回整条进度，返回受影响行数
    async fn write(
        conn: &mut PgConnection,
        progress: &CourseProgress,
        completion_edge: bool,
    ) -> Result<u64> {
        let sql = if completion_edge {
            UPDATE_PROGRESS_ON_EDGE
        } else {
            UPDATE_PROGRESS
        };

        let result = sqlx::query(sql)
            .bind(&progress.user_id)
            .bind(&progress.course_id)
            .bind(Json(&progress.completed_lessons))
            .bind(i16::from(progress.overall_progress))
            .bind(progress.is_completed)
            .bind(progress.completed_at)
            .bind(i16::from(progress.average_score))
            .bind(count_to_db(progress.total_time_spent_minutes))
            .bind(Json(&progress.quiz_results))
            .bind(progress.last_accessed_at)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    async fn lock_or_create(
        conn: &mut PgConnection,
        user_id: &str,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CourseProgress> {
        Self::ensure_row(&mut *conn, user_id, course_id, now).await?;
        Self::get_for_update(&mut *conn, user_id, course_id)
            .await?
            .ok_or_else(|| RewardError::Internal("进度记录插入后读取失败".to_string()))
    }
}

#[async_trait]
impl CourseProgressRepositoryTrait for CourseProgressRepository {
    async fn get(&self, user_id: &str, course_id: &str) -> Result<Option<CourseProgress>> {
        let sql = format!("{} WHERE user_id = $1 AND course_id = $2", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CourseProgress::from))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CourseProgress>> {
        let sql = format!(
            "{} WHERE user_id = $1 ORDER BY enrolled_at, course_id",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CourseProgress::from).collect())
    }

    async fn apply_lesson_completion(
        &self,
        user_id: &str,
        course_id: &str,
        lesson: CompletedLesson,
        total_lessons: u32,
    ) -> Result<ProgressUpdate> {
        let mut tx = self.pool.begin().await?;

        let mut progress = Self::lock_or_create(&mut tx, user_id, course_id, lesson.completed_at).await?;
        let applied = progress.apply_lesson(lesson, total_lessons);

        if applied.lesson_added {
            let affected = Self::write(&mut tx, &progress, applied.completion_edge).await?;
            if affected == 0 {
                // 事务随 tx drop 回滚
                return Err(RewardError::Conflict(format!(
                    "课程 {} 已被并发请求标记为完成",
                    course_id
                )));
            }
        }

        tx.commit().await?;

        Ok(ProgressUpdate { progress, applied })
    }

    async fn record_quiz_result(
        &self,
        user_id: &str,
        course_id: &str,
        quiz: QuizResult,
    ) -> Result<CourseProgress> {
        let mut tx = self.pool.begin().await?;

        let mut progress = Self::lock_or_create(&mut tx, user_id, course_id, quiz.completed_at).await?;
        progress.record_quiz(quiz);
        Self::write(&mut tx, &progress, false).await?;

        tx.commit().await?;
        Ok(progress)
    }

    async fn recalculate(
        &self,
        user_id: &str,
        course_id: &str,
        total_lessons: u32,
        now: DateTime<Utc>,
    ) -> Result<(CourseProgress, Recalculated)> {
        let mut tx = self.pool.begin().await?;

        let mut progress = Self::get_for_update(&mut tx, user_id, course_id)
            .await?
            .ok_or_else(|| RewardError::not_found("course_progress", format!("{user_id}/{course_id}")))?;
        let outcome = progress.recalculate(total_lessons, now);

        if outcome.changed {
            let affected = Self::write(&mut tx, &progress, outcome.completion_edge).await?;
            if affected == 0 {
                return Err(RewardError::Conflict(format!(
                    "课程 {} 已被并发请求标记为完成",
                    course_id
                )));
            }
        }

        tx.commit().await?;
        Ok((progress, outcome))
    }

    async fn mark_certificate_earned(&self, user_id: &str, course_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE course_progress
            SET certificate_earned = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_from_db_clamps() {
        assert_eq!(percent_from_db(-5), 0);
        assert_eq!(percent_from_db(67), 67);
        assert_eq!(percent_from_db(250), 100);
    }

    #[test]
    fn test_count_to_db_saturates() {
        assert_eq!(count_to_db(90), 90);
        assert_eq!(count_to_db(u32::MAX), i32::MAX);
    }
}

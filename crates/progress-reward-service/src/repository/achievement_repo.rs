//! 用户成就仓储
//!
//! 解锁通过 `ON CONFLICT ... DO UPDATE ... WHERE is_completed = false` 实现，
//! 已解锁的记录不会被覆盖，也不会被再次报告为新解锁。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::progress_repo::percent_from_db;
use super::traits::UserAchievementRepositoryTrait;
use crate::error::Result;
use crate::models::{AchievementMetadata, UserAchievement};

#[derive(sqlx::FromRow)]
struct UserAchievementRow {
    user_id: String,
    achievement_id: String,
    progress: i16,
    is_completed: bool,
    unlocked_at: Option<DateTime<Utc>>,
    current_value: i64,
    target_value: i64,
    updated_at: DateTime<Utc>,
}

impl From<UserAchievementRow> for UserAchievement {
    fn from(row: UserAchievementRow) -> Self {
        Self {
            user_id: row.user_id,
            achievement_id: row.achievement_id,
            progress: percent_from_db(row.progress),
            is_completed: row.is_completed,
            unlocked_at: row.unlocked_at,
            metadata: AchievementMetadata {
                current_value: row.current_value.max(0) as u64,
                target_value: row.target_value.max(0) as u64,
            },
            updated_at: row.updated_at,
        }
    }
}

fn value_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// 用户成就仓储
pub struct UserAchievementRepository {
    pool: PgPool,
}

impl UserAchievementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserAchievementRepositoryTrait for UserAchievementRepository {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        let rows = sqlx::query_as::<_, UserAchievementRow>(
            r#"
            SELECT user_id, achievement_id, progress, is_completed, unlocked_at,
                   current_value, target_value, updated_at
            FROM user_achievements
            WHERE user_id = $1
            ORDER BY unlocked_at NULLS LAST, achievement_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserAchievement::from).collect())
    }

    async fn record_progress(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: u8,
        metadata: AchievementMetadata,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_achievements
                (user_id, achievement_id, progress, is_completed, current_value, target_value,
                 created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, $4, $5, NOW(), NOW())
            ON CONFLICT (user_id, achievement_id) DO UPDATE
            SET progress = EXCLUDED.progress,
                current_value = EXCLUDED.current_value,
                target_value = EXCLUDED.target_value,
                updated_at = NOW()
            WHERE user_achievements.is_completed = FALSE
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .bind(i16::from(progress.min(99)))
        .bind(value_to_db(metadata.current_value))
        .bind(value_to_db(metadata.target_value))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unlock(
        &self,
        user_id: &str,
        achievement_id: &str,
        metadata: AchievementMetadata,
        unlocked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_achievements
                (user_id, achievement_id, progress, is_completed, unlocked_at,
                 current_value, target_value, created_at, updated_at)
            VALUES ($1, $2, 100, TRUE, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (user_id, achievement_id) DO UPDATE
            SET progress = 100,
                is_completed = TRUE,
                unlocked_at = EXCLUDED.unlocked_at,
                current_value = EXCLUDED.current_value,
                target_value = EXCLUDED.target_value,
                updated_at = NOW()
            WHERE user_achievements.is_completed = FALSE
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .bind(unlocked_at)
        .bind(value_to_db(metadata.current_value))
        .bind(value_to_db(metadata.target_value))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

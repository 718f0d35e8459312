//! 证书仓储
//!
//! (user_id, course_id) 唯一约束保证每门课至多一张证书

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::progress_repo::{count_to_db, percent_from_db};
use super::traits::CertificateRepositoryTrait;
use crate::error::{RewardError, Result};
use crate::models::Certificate;

const SELECT_COLUMNS: &str = r#"
    SELECT certificate_id, user_id, course_id, course_title, final_score, total_time_spent,
           completion_date, issued_date, completion_time, verification_url, total_lessons,
           total_quizzes, download_count, share_count
    FROM certificates
"#;

#[derive(sqlx::FromRow)]
struct CertificateRow {
    certificate_id: String,
    user_id: String,
    course_id: String,
    course_title: String,
    final_score: i16,
    total_time_spent: i32,
    completion_date: DateTime<Utc>,
    issued_date: DateTime<Utc>,
    completion_time: String,
    verification_url: String,
    total_lessons: i32,
    total_quizzes: i32,
    download_count: i32,
    share_count: i32,
}

impl From<CertificateRow> for Certificate {
    fn from(row: CertificateRow) -> Self {
        Self {
            certificate_id: row.certificate_id,
            user_id: row.user_id,
            course_id: row.course_id,
            course_title: row.course_title,
            final_score: percent_from_db(row.final_score),
            total_time_spent: row.total_time_spent.max(0) as u32,
            completion_date: row.completion_date,
            issued_date: row.issued_date,
            completion_time: row.completion_time,
            verification_url: row.verification_url,
            total_lessons: row.total_lessons.max(0) as u32,
            total_quizzes: row.total_quizzes.max(0) as u32,
            download_count: row.download_count.max(0) as u32,
            share_count: row.share_count.max(0) as u32,
        }
    }
}

/// 证书仓储
pub struct CertificateRepository {
    pool: PgPool,
}

impl CertificateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn increment(&self, certificate_id: &str, column: CounterColumn) -> Result<Certificate> {
        let sql = format!(
            r#"
            UPDATE certificates
            SET {column} = {column} + 1
            WHERE certificate_id = $1
            RETURNING certificate_id, user_id, course_id, course_title, final_score,
                      total_time_spent, completion_date, issued_date, completion_time,
                      verification_url, total_lessons, total_quizzes, download_count, share_count
            "#,
            column = column.as_str()
        );

        sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(certificate_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Certificate::from)
            .ok_or_else(|| RewardError::not_found("certificate", certificate_id))
    }
}

/// 可累加的计数列（固定白名单，避免拼接任意列名）
#[derive(Debug, Clone, Copy)]
enum CounterColumn {
    Download,
    Share,
}

impl CounterColumn {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download_count",
            Self::Share => "share_count",
        }
    }
}

#[async_trait]
impl CertificateRepositoryTrait for CertificateRepository {
    async fn find(&self, user_id: &str, course_id: &str) -> Result<Option<Certificate>> {
        let sql = format!("{} WHERE user_id = $1 AND course_id = $2", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Certificate::from))
    }

    async fn find_by_certificate_id(&self, certificate_id: &str) -> Result<Option<Certificate>> {
        let sql = format!("{} WHERE certificate_id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(certificate_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Certificate::from))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Certificate>> {
        let sql = format!("{} WHERE user_id = $1 ORDER BY issued_date DESC", SELECT_COLUMNS);
        let rows = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Certificate::from).collect())
    }

    async fn insert(&self, certificate: &Certificate) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO certificates
                (certificate_id, user_id, course_id, course_title, final_score, total_time_spent,
                 completion_date, issued_date, completion_time, verification_url, total_lessons,
                 total_quizzes, download_count, share_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(&certificate.certificate_id)
        .bind(&certificate.user_id)
        .bind(&certificate.course_id)
        .bind(&certificate.course_title)
        .bind(i16::from(certificate.final_score))
        .bind(count_to_db(certificate.total_time_spent))
        .bind(certificate.completion_date)
        .bind(certificate.issued_date)
        .bind(&certificate.completion_time)
        .bind(&certificate.verification_url)
        .bind(count_to_db(certificate.total_lessons))
        .bind(count_to_db(certificate.total_quizzes))
        .bind(count_to_db(certificate.download_count))
        .bind(count_to_db(certificate.share_count))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RewardError::Conflict(format!(
                "证书已存在: user_id={}, course_id={}",
                certificate.user_id, certificate.course_id
            )));
        }

        Ok(())
    }

    async fn increment_download(&self, certificate_id: &str) -> Result<Certificate> {
        self.increment(certificate_id, CounterColumn::Download).await
    }

    async fn increment_share(&self, certificate_id: &str) -> Result<Certificate> {
        self.increment(certificate_id, CounterColumn::Share).await
    }
}

//! 证书颁发服务
//!
//! 每个 (user, course) 至多一张证书。已有证书原样返回；
//! 并发颁发时唯一键冲突的一方重新读取并返回胜出的证书。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, instrument, warn};

use agrilearn_shared::observability::metrics;

use crate::config::RewardConfig;
use crate::error::{RewardError, Result};
use crate::models::{Certificate, CourseProgress};
use crate::repository::CertificateRepositoryTrait;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RANDOM_SUFFIX_LEN: usize = 6;

/// 颁发证书所需的课程信息
#[derive(Debug, Clone)]
pub struct CertificateContext {
    pub course_title: String,
    pub total_lessons: u32,
}

/// 颁发结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub certificate: Certificate,
    /// 本次调用是否新建了证书
    pub newly_issued: bool,
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// 生成证书编号：`CERT-<base36 毫秒时间戳>-<6 位随机 base36>`
pub fn generate_certificate_id(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let mut rng = rand::rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("CERT-{}-{}", to_base36(millis), suffix)
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// 报名到完成的时长描述
///
/// 不足一小时为 "less than an hour"，不足一天按小时，不足一周按天，
/// 其余为 "N weeks, M days"
pub fn completion_time_label(enrolled_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> String {
    let elapsed = completed_at - enrolled_at;
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if hours < 1 {
        "less than an hour".to_string()
    } else if days < 1 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        let weeks = days / 7;
        let rest = days % 7;
        if rest == 0 {
            plural(weeks, "week")
        } else {
            format!("{}, {}", plural(weeks, "week"), plural(rest, "day"))
        }
    }
}

/// 证书颁发服务
pub struct CertificateIssuer<CR>
where
    CR: CertificateRepositoryTrait,
{
    repo: Arc<CR>,
    config: RewardConfig,
}

impl<CR> CertificateIssuer<CR>
where
    CR: CertificateRepositoryTrait,
{
    pub fn new(repo: Arc<CR>, config: RewardConfig) -> Self {
        Self { repo, config }
    }

    /// 为已完成的课程颁发证书（幂等）
    #[instrument(skip(self, progress, context), fields(user_id = %progress.user_id, course_id = %progress.course_id))]
    pub async fn issue(
        &self,
        progress: &CourseProgress,
        context: &CertificateContext,
        now: DateTime<Utc>,
    ) -> Result<IssuedCertificate> {
        if let Some(existing) = self.repo.find(&progress.user_id, &progress.course_id).await? {
            return Ok(IssuedCertificate {
                certificate: existing,
                newly_issued: false,
            });
        }

        if !progress.is_completed {
            return Err(RewardError::Validation(format!(
                "课程 {} 尚未完成，不能颁发证书",
                progress.course_id
            )));
        }

        let completion_date = progress.completed_at.unwrap_or(now);
        let certificate_id = generate_certificate_id(now);
        let certificate = Certificate {
            verification_url: self.config.verification_url(&certificate_id),
            certificate_id,
            user_id: progress.user_id.clone(),
            course_id: progress.course_id.clone(),
            course_title: context.course_title.clone(),
            final_score: progress.final_score(),
            total_time_spent: progress.total_time_spent_minutes,
            completion_date,
            issued_date: now,
            completion_time: completion_time_label(progress.enrolled_at, completion_date),
            total_lessons: context.total_lessons,
            total_quizzes: progress.quiz_results.len() as u32,
            download_count: 0,
            share_count: 0,
        };

        match self.repo.insert(&certificate).await {
            Ok(()) => {
                metrics::record_certificate_issued(&certificate.course_id);
                info!(
                    certificate_id = %certificate.certificate_id,
                    final_score = certificate.final_score,
                    "证书颁发成功"
                );
                Ok(IssuedCertificate {
                    certificate,
                    newly_issued: true,
                })
            }
            Err(e) if e.is_conflict() => {
                warn!("证书已被并发请求创建，返回已有证书");
                let winner = self
                    .repo
                    .find(&progress.user_id, &progress.course_id)
                    .await?
                    .ok_or_else(|| {
                        RewardError::not_found(
                            "certificate",
                            format!("{}/{}", progress.user_id, progress.course_id),
                        )
                    })?;
                Ok(IssuedCertificate {
                    certificate: winner,
                    newly_issued: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find(&self, user_id: &str, course_id: &str) -> Result<Option<Certificate>> {
        self.repo.find(user_id, course_id).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Certificate>> {
        self.repo.list_by_user(user_id).await
    }

    /// 按公开编号校验证书
    pub async fn verify(&self, certificate_id: &str) -> Result<Certificate> {
        self.repo
            .find_by_certificate_id(certificate_id.trim())
            .await?
            .ok_or_else(|| RewardError::not_found("certificate", certificate_id))
    }

    pub async fn record_download(&self, certificate_id: &str) -> Result<Certificate> {
        self.repo.increment_download(certificate_id).await
    }

    pub async fn record_share(&self, certificate_id: &str) -> Result<Certificate> {
        self.repo.increment_share(certificate_id).await
    }
}

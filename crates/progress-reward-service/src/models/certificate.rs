//! 证书实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 课程结业证书
///
/// 每个 (user, course) 至多一张，创建后成绩和完成日期不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// 形如 `CERT-<base36 毫秒时间戳>-<6 位随机>` 的公开编号
    pub certificate_id: String,
    pub user_id: String,
    pub course_id: String,
    pub course_title: String,
    pub final_score: u8,
    /// 累计学习分钟数
    pub total_time_spent: u32,
    pub completion_date: DateTime<Utc>,
    pub issued_date: DateTime<Utc>,
    /// 报名到完成的时长描述，如 "2 weeks, 3 days"
    pub completion_time: String,
    pub verification_url: String,
    pub total_lessons: u32,
    pub total_quizzes: u32,
    pub download_count: u32,
    pub share_count: u32,
}

//! 课程定义
//!
//! 课程目录中的只读实体，运行期不可变。

use serde::{Deserialize, Serialize};

use crate::error::{RewardError, Result};

/// 课程定义
///
/// 课时总数由课时列表推导，构造时保证 `total_lessons == lesson_ids.len()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCourseDefinition")]
pub struct CourseDefinition {
    course_id: String,
    title: String,
    lesson_ids: Vec<String>,
}

/// 反序列化中间结构，`totalLessons` 可省略，若提供必须与课时列表一致
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCourseDefinition {
    course_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    total_lessons: Option<u32>,
    lesson_ids: Vec<String>,
}

impl TryFrom<RawCourseDefinition> for CourseDefinition {
    type Error = RewardError;

    fn try_from(raw: RawCourseDefinition) -> Result<Self> {
        if let Some(total) = raw.total_lessons
            && total as usize != raw.lesson_ids.len()
        {
            return Err(RewardError::Validation(format!(
                "课程 {} 声明 {} 个课时，实际列出 {} 个",
                raw.course_id,
                total,
                raw.lesson_ids.len()
            )));
        }
        let title = raw.title.unwrap_or_else(|| raw.course_id.clone());
        Self::new(raw.course_id, title, raw.lesson_ids)
    }
}

impl CourseDefinition {
    /// 创建课程定义
    ///
    /// 课程 ID 不能为空，至少一个课时，课时 ID 不能为空或重复
    pub fn new(
        course_id: impl Into<String>,
        title: impl Into<String>,
        lesson_ids: Vec<String>,
    ) -> Result<Self> {
        let course_id = course_id.into();
        if course_id.trim().is_empty() {
            return Err(RewardError::Validation("课程 ID 不能为空".to_string()));
        }
        if lesson_ids.is_empty() {
            return Err(RewardError::Validation(format!(
                "课程 {} 至少需要一个课时",
                course_id
            )));
        }
        for (idx, lesson_id) in lesson_ids.iter().enumerate() {
            if lesson_id.trim().is_empty() {
                return Err(RewardError::Validation(format!(
                    "课程 {} 第 {} 个课时 ID 为空",
                    course_id,
                    idx + 1
                )));
            }
            if lesson_ids[..idx].contains(lesson_id) {
                return Err(RewardError::Validation(format!(
                    "课程 {} 课时 ID 重复: {}",
                    course_id, lesson_id
                )));
            }
        }

        Ok(Self {
            course_id,
            title: title.into(),
            lesson_ids,
        })
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lesson_ids(&self) -> &[String] {
        &self.lesson_ids
    }

    pub fn total_lessons(&self) -> u32 {
        self.lesson_ids.len() as u32
    }

    pub fn contains_lesson(&self, lesson_id: &str) -> bool {
        self.lesson_ids.iter().any(|id| id == lesson_id)
    }
}

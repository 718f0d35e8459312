//! 静态课程目录
//!
//! 启动时从内置数据或 JSON 文件加载，运行期只读。

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use super::CourseCatalog;
use super::seed;
use crate::error::{RewardError, Result};
use crate::models::CourseDefinition;

/// 内存课程目录
#[derive(Debug, Clone)]
pub struct StaticCourseCatalog {
    courses: HashMap<String, CourseDefinition>,
    default_lesson_count: u32,
}

impl StaticCourseCatalog {
    /// 由课程列表构建，课程 ID 重复时报错
    pub fn from_courses(courses: Vec<CourseDefinition>, default_lesson_count: u32) -> Result<Self> {
        if default_lesson_count == 0 {
            return Err(RewardError::Validation(
                "default_lesson_count 必须大于 0".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(courses.len());
        for course in courses {
            let course_id = course.course_id().to_string();
            if index.insert(course_id.clone(), course).is_some() {
                return Err(RewardError::Validation(format!("课程 ID 重复: {}", course_id)));
            }
        }

        Ok(Self {
            courses: index,
            default_lesson_count,
        })
    }

    /// 内置的可可种植课程目录
    pub fn cacao(default_lesson_count: u32) -> Result<Self> {
        Self::from_courses(seed::cacao_courses()?, default_lesson_count)
    }

    /// 从 JSON 数组解析（`[{"courseId", "title", "lessonIds"}]`）
    pub fn from_json_str(json: &str, default_lesson_count: u32) -> Result<Self> {
        let courses: Vec<CourseDefinition> = serde_json::from_str(json)?;
        Self::from_courses(courses, default_lesson_count)
    }

    /// 从 JSON 文件加载
    pub fn from_json_file(path: impl AsRef<Path>, default_lesson_count: u32) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RewardError::Internal(format!("读取课程目录 {} 失败: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&json, default_lesson_count)?;
        info!(
            path = %path.display(),
            courses = catalog.courses.len(),
            "课程目录已加载"
        );
        Ok(catalog)
    }

    pub fn default_lesson_count(&self) -> u32 {
        self.default_lesson_count
    }
}

impl CourseCatalog for StaticCourseCatalog {
    fn course(&self, course_id: &str) -> Option<CourseDefinition> {
        self.courses.get(course_id).cloned()
    }

    fn lesson_count(&self, course_id: &str) -> u32 {
        self.courses
            .get(course_id)
            .map(|c| c.total_lessons())
            .unwrap_or(self.default_lesson_count)
    }

    fn lesson_ids(&self, course_id: &str) -> Option<Vec<String>> {
        self.courses.get(course_id).map(|c| c.lesson_ids().to_vec())
    }

    fn total_courses(&self) -> u32 {
        self.courses.len() as u32
    }

    fn course_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.courses.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacao_catalog_lesson_counts() {
        let catalog = StaticCourseCatalog::cacao(4).unwrap();
        assert_eq!(catalog.total_courses(), 8);
        let ids = catalog.course_ids();
        assert_eq!(ids.len(), 8);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(catalog.lesson_count("gap-practices"), 3);
        assert_eq!(catalog.lesson_count("harvest-processing"), 11);
        assert_eq!(catalog.lesson_count("pest-disease"), 15);
        assert_eq!(catalog.lesson_count("care-management"), 9);
        assert_eq!(
            catalog.lesson_ids("cacao-history").unwrap().first().map(String::as_str),
            Some("ancient-origins")
        );
    }

    #[test]
    fn test_unknown_course_falls_back_to_default() {
        let catalog = StaticCourseCatalog::cacao(4).unwrap();
        assert_eq!(catalog.lesson_count("organic-certification"), 4);
        assert!(catalog.course("organic-certification").is_none());
        assert!(catalog.lesson_ids("organic-certification").is_none());
    }

    #[test]
    fn test_duplicate_course_rejected() {
        let course = CourseDefinition::new("c1", "One", vec!["a".to_string()]).unwrap();
        let result = StaticCourseCatalog::from_courses(vec![course.clone(), course], 4);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_default_rejected() {
        assert!(StaticCourseCatalog::from_courses(vec![], 0).is_err());
    }

    #[test]
    fn test_from_json_str() {
        let catalog = StaticCourseCatalog::from_json_str(
            r#"[{"courseId":"soil-101","title":"Soil","lessonIds":["a","b"]}]"#,
            6,
        )
        .unwrap();
        assert_eq!(catalog.lesson_count("soil-101"), 2);
        assert_eq!(catalog.lesson_count("missing"), 6);
        assert_eq!(catalog.default_lesson_count(), 6);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = StaticCourseCatalog::from_json_file("/nonexistent/catalog.json", 4);
        assert!(matches!(result, Err(RewardError::Internal(_))));
    }
}

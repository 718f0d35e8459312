//! 课程目录与成就目录
//!
//! 两个目录都是只读的外部协作方，服务层通过 trait 注入，
//! 便于在测试中替换为 mock 或自定义课程集合。

mod achievement_catalog;
mod course_catalog;
pub mod seed;

pub use achievement_catalog::StaticAchievementCatalog;
pub use course_catalog::StaticCourseCatalog;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AchievementDefinition, CourseDefinition};

/// 课程目录
///
/// 未知课程不报错，`lesson_count` 回退到默认课时数
#[cfg_attr(test, mockall::automock)]
pub trait CourseCatalog: Send + Sync {
    fn course(&self, course_id: &str) -> Option<CourseDefinition>;

    /// 课程课时数，未知课程返回默认值
    fn lesson_count(&self, course_id: &str) -> u32;

    /// 有序课时 ID，未知课程返回 None
    fn lesson_ids(&self, course_id: &str) -> Option<Vec<String>>;

    /// 目录中的课程总数
    fn total_courses(&self) -> u32;

    /// 目录中的全部课程 ID（升序），用于 "all" 类成就
    fn course_ids(&self) -> Vec<String>;
}

/// 成就目录
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementCatalog: Send + Sync {
    /// 所有启用的成就定义，按 sort_order 升序
    async fn list_active(&self) -> Result<Vec<AchievementDefinition>>;

    /// 按 ID 查找（包括未启用的）
    async fn get(&self, achievement_id: &str) -> Result<Option<AchievementDefinition>>;
}

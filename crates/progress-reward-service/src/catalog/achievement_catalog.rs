//! 静态成就目录

use async_trait::async_trait;

use super::AchievementCatalog;
use super::seed;
use crate::error::{RewardError, Result};
use crate::models::AchievementDefinition;

/// 内存成就目录
///
/// 构造时按 sort_order、ID 排序，`list_active` 直接按序返回
#[derive(Debug, Clone)]
pub struct StaticAchievementCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl StaticAchievementCatalog {
    pub fn new(mut definitions: Vec<AchievementDefinition>) -> Result<Self> {
        definitions.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        if let Some(dup) = definitions
            .iter()
            .enumerate()
            .find(|(idx, def)| definitions[..*idx].iter().any(|d| d.id == def.id))
            .map(|(_, def)| def.id.clone())
        {
            return Err(RewardError::Validation(format!("成就 ID 重复: {}", dup)));
        }
        Ok(Self { definitions })
    }

    /// 内置的成就目录
    pub fn cacao() -> Self {
        let mut definitions = seed::cacao_achievements();
        definitions.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        Self { definitions }
    }

    /// 从 JSON 数组解析，条件载荷不合法的定义会导致整体加载失败
    pub fn from_json_str(json: &str) -> Result<Self> {
        let definitions: Vec<AchievementDefinition> = serde_json::from_str(json)?;
        Self::new(definitions)
    }

    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }
}

#[async_trait]
impl AchievementCatalog for StaticAchievementCatalog {
    async fn list_active(&self) -> Result<Vec<AchievementDefinition>> {
        Ok(self
            .definitions
            .iter()
            .filter(|d| d.is_active)
            .cloned()
            .collect())
    }

    async fn get(&self, achievement_id: &str) -> Result<Option<AchievementDefinition>> {
        Ok(self
            .definitions
            .iter()
            .find(|d| d.id == achievement_id)
            .cloned())
    }
}

//! 奖励链路配置
//!
//! 对应配置文件中的 `[rewards]` 段，与 `AppConfig` 共用同一套分层加载规则。

use serde::Deserialize;

use agrilearn_shared::config::load_section;

/// `[rewards]` 配置段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// 课程目录中不存在的课程使用的课时数
    pub default_lesson_count: u32,
    /// 请求未携带学习时长时，每个课时计入的分钟数
    pub default_lesson_minutes: u32,
    /// 证书校验地址前缀，证书 ID 拼接在其后
    pub verification_base_url: String,
    /// 可选的 JSON 课程目录文件，未配置时使用内置目录
    pub catalog_path: Option<String>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            default_lesson_count: 4,
            default_lesson_minutes: 30,
            verification_base_url: "https://agrilearn.example.com/verify".to_string(),
            catalog_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RewardSection {
    #[serde(default)]
    rewards: RewardConfig,
}

impl RewardConfig {
    /// 从分层配置中读取 `[rewards]` 段
    pub fn load(service_name: &str) -> Result<Self, config::ConfigError> {
        load_section::<RewardSection>(service_name).map(|section| section.rewards)
    }

    /// 证书的公开校验地址
    pub fn verification_url(&self, certificate_id: &str) -> String {
        format!(
            "{}/{}",
            self.verification_base_url.trim_end_matches('/'),
            certificate_id
        )
    }
}

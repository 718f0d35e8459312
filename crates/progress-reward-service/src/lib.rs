//! 学习进度奖励服务
//!
//! 把课时完成转换为课程完成、证书、成就和站内通知。
//!
//! ## 核心功能
//!
//! - **学习进度**：按课程目录计算完成百分比，100% 与完成状态严格一致
//! - **完成边沿**：课程从未完成到完成的翻转是一次原子读改写，并发下只触发一次
//! - **证书颁发**：每门课程至多一张证书，重复或并发请求返回同一张
//! - **成就评估**：按类别的条件模型评估用户累计统计，解锁后不再回退
//! - **站内通知**：只为真实发生的奖励派发事件
//! - **对账**：重新计算进度并补发缺失的奖励
//!
//! ## 模块结构
//!
//! - `models`: 领域模型
//! - `catalog`: 课程目录与成就目录
//! - `achievement`: 用户统计与成就评估
//! - `repository`: Postgres 与内存仓储
//! - `notification`: 奖励事件与通知派发
//! - `service`: 业务服务层
//! - `config`: `[rewards]` 配置段
//! - `error`: 错误类型

pub mod achievement;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod notification;
pub mod repository;
pub mod service;

pub use achievement::{AchievementEvaluator, AchievementProgress, UserStats};
pub use catalog::{AchievementCatalog, CourseCatalog, StaticAchievementCatalog, StaticCourseCatalog};
pub use config::RewardConfig;
pub use error::{RewardError, Result};
pub use models::*;
pub use notification::{NotificationDispatcher, RewardEvent, StoredNotificationDispatcher};
pub use service::{
    CertificateIssuer, LearnerQueryService, ProgressStore, RewardCoordinator, dto,
};

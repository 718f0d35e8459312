//! 仓储层
//!
//! Postgres 实现用于生产，DashMap 内存实现用于开发和测试。

mod achievement_repo;
mod certificate_repo;
pub mod memory;
mod notification_repo;
mod progress_repo;
mod traits;

pub use achievement_repo::UserAchievementRepository;
pub use certificate_repo::CertificateRepository;
pub use memory::{
    MemoryCertificateRepository, MemoryCourseProgressRepository, MemoryNotificationRepository,
    MemoryUserAchievementRepository,
};
pub use notification_repo::NotificationRepository;
pub use progress_repo::CourseProgressRepository;
pub use traits::*;

//! 服务层
//!
//! - `dto`: 请求与响应
//! - `progress_store`: 学习进度写入与校验
//! - `certificate_issuer`: 证书颁发与校验
//! - `reward_coordinator`: 课时完成到奖励发放的编排
//! - `query_service`: 只读查询

pub mod certificate_issuer;
pub mod dto;
pub mod progress_store;
pub mod query_service;
pub mod reward_coordinator;

pub use certificate_issuer::{
    CertificateContext, CertificateIssuer, IssuedCertificate, completion_time_label,
    generate_certificate_id,
};
pub use dto::*;
pub use progress_store::ProgressStore;
pub use query_service::LearnerQueryService;
pub use reward_coordinator::RewardCoordinator;

//! 共享库
//!
//! 包含学习平台各服务共用的配置加载、错误处理、数据库连接和可观测性等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod test_utils;

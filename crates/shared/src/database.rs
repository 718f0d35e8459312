//! 进度奖励存储的 PostgreSQL 连接
//!
//! 进度、成就、证书和通知四张表共用一个连接池。完成边沿依赖行级锁，
//! 因此所有仓储必须通过同一个 [`Database`] 取得连接。

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// 嵌入的建表脚本，位于工作区根目录 `migrations/`
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// 进度奖励数据库
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 按配置建立连接池并确认数据库可用
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        let db = Self { pool };
        db.health_check().await?;
        info!(
            min_connections = config.min_connections,
            "Progress store connection pool ready"
        );
        Ok(db)
    }

    /// 仓储构造时克隆的连接池
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(SharedError::from)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Progress store connection pool closed");
    }

    /// 建立 course_progress、user_achievements、certificates、notifications 表
    ///
    /// 已执行过的脚本会被跳过，重复调用是安全的
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        debug!(scripts = MIGRATOR.iter().count(), "Applying progress store migrations");
        MIGRATOR.run(&self.pool).await?;
        info!("Progress store schema up to date");
        Ok(())
    }
}

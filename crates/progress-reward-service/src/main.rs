//! 学习进度奖励维护工具
//!
//! 连接数据库执行对账和查询：
//!
//! ```text
//! progress-reward reconcile <user_id>    重新计算进度并补发缺失奖励
//! progress-reward evaluate <user_id>     重新评估成就
//! progress-reward stats <user_id>        输出学习统计
//! progress-reward verify <certificate>   校验证书
//! ```
//!
//! `--log-level` 覆盖配置中的日志级别，`RUST_LOG` 优先。

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use agrilearn_shared::{config::AppConfig, database::Database, observability};
use progress_reward::{
    catalog::{AchievementCatalog, CourseCatalog, StaticAchievementCatalog, StaticCourseCatalog},
    config::RewardConfig,
    notification::{NotificationDispatcher, StoredNotificationDispatcher},
    repository::{
        CertificateRepository, CourseProgressRepository, NotificationRepository,
        UserAchievementRepository,
    },
    service::{CertificateIssuer, LearnerQueryService, ProgressStore, RewardCoordinator},
};

const SERVICE_NAME: &str = "progress-reward-service";

/// 学习进度奖励维护工具
///
/// 结果以 JSON 输出到标准输出，日志写到标准错误。
#[derive(Parser, Debug)]
#[command(name = "progress-reward")]
#[command(version, about = "学习进度奖励对账与查询工具")]
struct Cli {
    /// 覆盖配置中的日志级别 (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 重新计算进度并补发缺失的证书和成就
    #[command(alias = "recalculate")]
    Reconcile {
        /// 用户 ID
        user_id: String,
    },

    /// 重新评估用户成就
    Evaluate {
        /// 用户 ID
        user_id: String,
    },

    /// 输出学习统计
    Stats {
        /// 用户 ID
        user_id: String,
    },

    /// 校验证书编号
    Verify {
        /// 证书编号，如 CERT-1700000000000-AB12CD34E
        certificate_id: String,
    },
}

fn load_course_catalog(config: &RewardConfig) -> Result<StaticCourseCatalog> {
    let catalog = match &config.catalog_path {
        Some(path) => StaticCourseCatalog::from_json_file(path, config.default_lesson_count)?,
        None => StaticCourseCatalog::cacao(config.default_lesson_count)?,
    };
    Ok(catalog)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. 加载配置
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    let reward_config = RewardConfig::load(SERVICE_NAME).context("invalid [rewards] section")?;

    // 2. 可观测性（维护工具不暴露指标端口）
    let mut obs_config = config.observability.clone().with_service_name(SERVICE_NAME);
    obs_config.metrics_enabled = false;
    if let Some(level) = cli.log_level {
        obs_config.log_level = level;
    }
    let _guard = observability::init(&obs_config).await?;
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 数据库
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let pool = db.pool().clone();

    // 4. 目录与仓储
    let course_catalog: Arc<dyn CourseCatalog> = Arc::new(load_course_catalog(&reward_config)?);
    let achievement_catalog: Arc<dyn AchievementCatalog> =
        Arc::new(StaticAchievementCatalog::cacao());

    let progress_repo = Arc::new(CourseProgressRepository::new(pool.clone()));
    let achievement_repo = Arc::new(UserAchievementRepository::new(pool.clone()));
    let certificate_repo = Arc::new(CertificateRepository::new(pool.clone()));
    let notification_repo = Arc::new(NotificationRepository::new(pool));

    // 5. 服务
    let progress_store = Arc::new(ProgressStore::new(
        progress_repo.clone(),
        course_catalog.clone(),
        reward_config.default_lesson_minutes,
    ));
    let certificates = Arc::new(CertificateIssuer::new(
        certificate_repo.clone(),
        reward_config.clone(),
    ));
    let dispatcher: Arc<dyn NotificationDispatcher> =
        Arc::new(StoredNotificationDispatcher::new(notification_repo.clone()));
    let coordinator = RewardCoordinator::new(
        progress_store,
        certificates.clone(),
        achievement_repo.clone(),
        achievement_catalog.clone(),
        dispatcher,
    );
    let queries = LearnerQueryService::new(
        progress_repo,
        achievement_repo,
        certificate_repo,
        notification_repo,
        course_catalog,
        achievement_catalog,
    );

    let output = match cli.command {
        Command::Reconcile { user_id } => {
            serde_json::to_string_pretty(&coordinator.reconcile(&user_id).await?)?
        }
        Command::Evaluate { user_id } => {
            serde_json::to_string_pretty(&coordinator.evaluate_achievements(&user_id).await?)?
        }
        Command::Stats { user_id } => {
            serde_json::to_string_pretty(&queries.learner_stats(&user_id).await?)?
        }
        Command::Verify { certificate_id } => {
            serde_json::to_string_pretty(&certificates.verify(&certificate_id).await?)?
        }
    };
    println!("{output}");

    db.close().await;
    Ok(())
}

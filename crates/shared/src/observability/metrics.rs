//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    describe_pipeline_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册进度奖励链路的指标描述
///
/// 描述会出现在 /metrics 端点的 HELP 注释中。
fn describe_pipeline_metrics(service_name: &str) {
    metrics::describe_counter!(
        "lesson_completions_total",
        "Total number of lesson completion requests"
    );
    metrics::describe_counter!(
        "course_completions_total",
        "Total number of observed course completion edges"
    );
    metrics::describe_counter!(
        "certificates_issued_total",
        "Total number of certificates issued"
    );
    metrics::describe_counter!(
        "achievements_unlocked_total",
        "Total number of achievements unlocked"
    );
    metrics::describe_counter!(
        "notifications_dispatched_total",
        "Total number of reward notifications dispatched"
    );
    metrics::describe_counter!(
        "reward_stage_failures_total",
        "Total number of isolated downstream stage failures"
    );
    metrics::describe_histogram!(
        "reward_pipeline_duration_seconds",
        "Progress-to-reward pipeline duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 链路指标记录函数
// ============================================================================

/// 记录课时完成请求
#[inline]
pub fn record_lesson_completion(course_id: &str, lesson_added: bool) {
    metrics::counter!(
        "lesson_completions_total",
        "course_id" => course_id.to_string(),
        "lesson_added" => lesson_added.to_string()
    )
    .increment(1);
}

/// 记录课程完成边沿
#[inline]
pub fn record_course_completion(course_id: &str, trigger: &str) {
    metrics::counter!(
        "course_completions_total",
        "course_id" => course_id.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

/// 记录证书颁发
#[inline]
pub fn record_certificate_issued(course_id: &str) {
    metrics::counter!(
        "certificates_issued_total",
        "course_id" => course_id.to_string()
    )
    .increment(1);
}

/// 记录成就解锁
#[inline]
pub fn record_achievement_unlocked(category: &str, rarity: &str) {
    metrics::counter!(
        "achievements_unlocked_total",
        "category" => category.to_string(),
        "rarity" => rarity.to_string()
    )
    .increment(1);
}

/// 记录通知派发
#[inline]
pub fn record_notification(kind: &str, status: &str) {
    metrics::counter!(
        "notifications_dispatched_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录下游阶段失败（失败已被隔离，不影响主流程）
#[inline]
pub fn record_stage_failure(stage: &str) {
    metrics::counter!(
        "reward_stage_failures_total",
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// 记录整条链路耗时
#[inline]
pub fn record_pipeline_duration(operation: &str, duration_secs: f64) {
    metrics::histogram!(
        "reward_pipeline_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

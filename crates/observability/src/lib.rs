//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 历元、采样与投递指标收集与运行摘要
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init, RelayStatsAggregator};
//!
//! // 初始化
//! observability::init()?;
//!
//! // 记录采样输出
//! let mut stats = RelayStatsAggregator::new();
//! for emission in sampler.process_update(&fix)? {
//!     observability::record_emission(emission.reason.as_str(), &emission.record);
//!     stats.update_emission(emission.reason.as_str(), &emission.record);
//! }
//! ```

pub mod metrics;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_emission, record_epoch_completed, record_read_idle, record_sampler_rejection,
    RelayStatsAggregator, RelaySummary, RunningStats, StatsSummary,
};

/// 采样阈值直方图的桶边界 (米)
///
/// 覆盖默认的 50 m .. 30 km 区间。
pub const THRESHOLD_BUCKETS: &[f64] = &[
    50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 20_000.0, 30_000.0,
];

/// 初始化可观测性：JSON 日志，不导出指标
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 默认日志级别 (RUST_LOG 优先)
    pub default_log_level: String,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// Prometheus 监听地址
    pub metrics_addr: IpAddr,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            metrics_port: None,
            metrics_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl ObservabilityConfig {
    /// Prometheus 监听地址；端口未配置时为 None
    pub fn metrics_endpoint(&self) -> Option<SocketAddr> {
        self.metrics_port
            .map(|port| SocketAddr::new(self.metrics_addr, port))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化
///
/// 日志写到 stderr，stdout 留给命令输出。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(endpoint) = config.metrics_endpoint() {
        install_exporter(endpoint)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics = ?config.metrics_endpoint(),
        "Observability initialized"
    );

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于日志已由 CLI 初始化的场景，监听所有地址。
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_exporter(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
}

fn install_exporter(endpoint: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(endpoint)
        .set_buckets_for_metric(
            Matcher::Full("gnss_relay_sampling_threshold_meters".to_string()),
            THRESHOLD_BUCKETS,
        )
        .context("Invalid histogram buckets")?
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(%endpoint, "Prometheus metrics endpoint initialized");
    Ok(())
}

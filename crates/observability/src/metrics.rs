//! Relay 指标收集模块
//!
//! 记录历元、采样决策与投递队列的运行指标，并在内存中聚合运行摘要。

use std::collections::BTreeMap;

use contracts::FixRecord;
use metrics::{counter, gauge, histogram};

/// 记录一个完整历元
///
/// `satellites` 为本历元 GSV 报告的卫星总数。
pub fn record_epoch_completed(satellites: usize) {
    histogram!("gnss_relay_epoch_satellites").record(satellites as f64);
    gauge!("gnss_relay_satellites_in_view").set(satellites as f64);
}

/// 记录一次采样输出
///
/// # Example
///
/// ```ignore
/// for emission in sampler.process_update(&fix)? {
///     observability::record_emission(emission.reason.as_str(), &emission.record);
/// }
/// ```
pub fn record_emission(reason: &str, record: &FixRecord) {
    counter!("gnss_relay_emissions_total", "reason" => reason.to_string()).increment(1);
    gauge!("gnss_relay_last_emission_timestamp").set(record.timestamp as f64);
    gauge!("gnss_relay_last_speed_knots").set(record.speed_over_ground);
}

/// 记录被采样器拒绝的更新
pub fn record_sampler_rejection(kind: &str) {
    counter!("gnss_relay_updates_rejected_total", "kind" => kind.to_string()).increment(1);
}

/// 记录读超时（无数据）
pub fn record_read_idle() {
    counter!("gnss_relay_read_idle_total").increment(1);
}

/// 运行指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RelayStatsAggregator {
    /// 完整历元数
    pub epochs: u64,

    /// 输出记录数
    pub emissions: u64,

    /// 各原因的输出次数
    pub emissions_by_reason: BTreeMap<String, u64>,

    /// 被拒绝的更新数
    pub rejected_updates: u64,

    /// 各原因的拒绝次数
    pub rejections_by_kind: BTreeMap<String, u64>,

    /// 每历元卫星数统计
    pub satellite_stats: RunningStats,

    /// 输出记录航速统计 (节)
    pub speed_stats: RunningStats,

    /// 相邻输出之间的时间间隔 (秒)
    pub emission_gap_stats: RunningStats,

    last_emission_t: Option<i64>,
}

impl RelayStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 完整历元
    pub fn update_epoch(&mut self, satellites: usize) {
        self.epochs += 1;
        self.satellite_stats.push(satellites as f64);
    }

    /// 采样输出
    pub fn update_emission(&mut self, reason: &str, record: &FixRecord) {
        self.emissions += 1;
        *self
            .emissions_by_reason
            .entry(reason.to_string())
            .or_insert(0) += 1;
        self.speed_stats.push(record.speed_over_ground);

        if let Some(last) = self.last_emission_t {
            self.emission_gap_stats
                .push((record.timestamp - last).abs() as f64);
        }
        self.last_emission_t = Some(record.timestamp);
    }

    /// 被拒绝的更新
    pub fn update_rejection(&mut self, kind: &str) {
        self.rejected_updates += 1;
        *self.rejections_by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> RelaySummary {
        RelaySummary {
            epochs: self.epochs,
            emissions: self.emissions,
            rejected_updates: self.rejected_updates,
            decimation_rate: if self.epochs > 0 {
                (1.0 - self.emissions as f64 / self.epochs as f64).max(0.0) * 100.0
            } else {
                0.0
            },
            emissions_by_reason: self.emissions_by_reason.clone(),
            rejections_by_kind: self.rejections_by_kind.clone(),
            satellites: StatsSummary::from(&self.satellite_stats),
            speed_knots: StatsSummary::from(&self.speed_stats),
            emission_gap_s: StatsSummary::from(&self.emission_gap_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct RelaySummary {
    pub epochs: u64,
    pub emissions: u64,
    pub rejected_updates: u64,
    /// 未输出的历元占比 (%)
    pub decimation_rate: f64,
    pub emissions_by_reason: BTreeMap<String, u64>,
    pub rejections_by_kind: BTreeMap<String, u64>,
    pub satellites: StatsSummary,
    pub speed_knots: StatsSummary,
    pub emission_gap_s: StatsSummary,
}

impl std::fmt::Display for RelaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Relay Summary ===")?;
        writeln!(f, "Epochs: {}", self.epochs)?;
        writeln!(
            f,
            "Emissions: {} (decimated {:.2}%)",
            self.emissions, self.decimation_rate
        )?;
        for (reason, count) in &self.emissions_by_reason {
            writeln!(f, "  {}: {}", reason, count)?;
        }
        writeln!(f, "Rejected updates: {}", self.rejected_updates)?;
        for (kind, count) in &self.rejections_by_kind {
            writeln!(f, "  {}: {}", kind, count)?;
        }
        writeln!(f, "Satellites per epoch: {}", self.satellites)?;
        writeln!(f, "Speed (knots): {}", self.speed_knots)?;
        writeln!(f, "Emission gap (s): {}", self.emission_gap_s)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

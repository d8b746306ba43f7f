//! 窗口统计量

use crate::window::SampleWindow;

/// Means and population standard deviations over the window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub samples: usize,
    pub mean_distance: f64,
    pub mean_speed: f64,
    pub stdev_distance: f64,
    pub stdev_speed: f64,
    pub stdev_course: f64,
}

impl WindowStats {
    /// 计算窗口统计量（样本数 ≤ 1 时标准差为 0）
    pub fn compute(window: &SampleWindow) -> Self {
        let distance: Vec<f64> = window.iter().map(|u| u.distance_change).collect();
        let speed: Vec<f64> = window.iter().map(|u| u.record.speed_over_ground).collect();
        let course: Vec<f64> = window.iter().map(|u| u.cyclical_course).collect();

        Self {
            samples: distance.len(),
            mean_distance: mean(&distance),
            mean_speed: mean(&speed),
            stdev_distance: population_stdev(&distance),
            stdev_speed: population_stdev(&speed),
            stdev_course: population_stdev(&course),
        }
    }

    /// Course volatility normalized by speed
    pub fn volatility_ratio(&self) -> f64 {
        self.stdev_course / (1.0 + self.mean_speed.max(0.0).sqrt())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_stdev(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

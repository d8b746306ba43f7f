//! # Sampler
//!
//! 自适应采样器：根据车辆运动状态决定哪些定位记录需要上报。
//!
//! 负责：
//! - 停车 / 启动滞回（pause / resume）
//! - 基于航向波动率的动态采样距离
//! - 滑动窗口回放与阈值触发
//!
//! 采样器是纯状态机，不做任何 I/O；调用方负责把返回的记录写入投递队列。
//!
//! ## 使用示例
//!
//! ```ignore
//! use sampler::{AdaptiveSampler, SamplerConfig};
//!
//! let mut sampler = AdaptiveSampler::new(SamplerConfig::default())?;
//!
//! for emission in sampler.process_update(&epoch_fix)? {
//!     queue.enqueue(&emission.record)?;
//! }
//! ```

mod dynamic;
mod error;
mod geo;
mod sampler;
mod stats;
mod window;

pub use dynamic::dynamic_sampling_distance;
pub use error::SamplerError;
pub use geo::{PLANET_RADIUS_M, cyclical_course, haversine};
pub use sampler::{AdaptiveSampler, Emission, EmissionReason};
pub use stats::WindowStats;
pub use window::{SampleWindow, Update};

// Re-export contracts types
pub use contracts::{EpochFix, FixRecord, SamplerConfig};

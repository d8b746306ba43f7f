//! # Dispatcher
//!
//! 记录投递模块。
//!
//! 负责：
//! - 持久化投递队列（崩溃后未确认的记录会重新投递）
//! - 独立写入任务落盘，采样链路不等待 fsync
//! - Worker pool 消费队列，失败时指数退避重试
//! - Publisher 实现（log / file / udp / tcp）
//! - 原始历元归档，不阻塞主链路

pub mod archive;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod publishers;
pub mod queue;
pub mod writer;

pub use archive::{ArchiveSummary, RawArchive, DEFAULT_ARCHIVE_CAPACITY};
pub use contracts::{FixRecord, Publisher};
pub use error::{DispatcherError, QueueError};
pub use metrics::{DeliveryMetrics, MetricsSnapshot};
pub use pool::{PoolConfig, ShutdownReport, WorkerPool};
pub use publishers::{
    create_publisher, AnyPublisher, FilePublisher, LogPublisher, TcpPublisher, UdpPublisher,
    WireFormat,
};
pub use queue::{Delivery, DeliveryQueue};
pub use writer::{QueueWriter, WriterSummary, DEFAULT_WRITER_CAPACITY};

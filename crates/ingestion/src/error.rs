//! Ingestion 错误类型

use thiserror::Error;

/// NMEA 语句解码错误
///
/// 只覆盖整句级别的失败；单个字段解析失败产生 `None`，不会报错。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// 空行
    #[error("empty sentence")]
    Empty,

    /// 缺少 `$` / `!` 起始符
    #[error("missing sentence start delimiter")]
    MissingStart,

    /// 地址字段不是 5 个字符 (talker + 类型)
    #[error("malformed address field '{0}'")]
    BadAddress(String),

    /// 校验和不是两位十六进制
    #[error("malformed checksum '{0}'")]
    BadChecksumField(String),

    /// 校验和不匹配
    #[error("checksum mismatch: expected {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch {
        /// 语句携带的校验和
        expected: u8,
        /// 实际计算出的校验和
        computed: u8,
    },
}

/// 坐标转换错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// 坐标文本为空
    #[error("empty coordinate")]
    Empty,

    /// 不是 `dddmm.mmmm` 形式
    #[error("malformed coordinate '{0}'")]
    Malformed(String),

    /// 半球标识不是 N/S/E/W
    #[error("unknown hemisphere '{0}'")]
    Hemisphere(char),

    /// 分钟 >= 60 或度数越界
    #[error("coordinate '{0}' out of range")]
    OutOfRange(String),
}

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 打开输入源失败
    #[error("failed to open input '{path}': {source}")]
    OpenFailed {
        /// 输入路径
        path: String,
        /// 底层 IO 错误
        #[source]
        source: std::io::Error,
    },

    /// 读取输入失败
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;

//! Sampler 错误类型

use contracts::FixStatus;
use thiserror::Error;

/// Per-update rejection or invalid setting
///
/// None of these touch sampler state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    /// Receiver did not report a valid fix
    #[error("fix status is {0:?}, not valid")]
    NotValid(FixStatus),

    /// Epoch fix lacks a field the record needs
    #[error("fix is missing {0}")]
    MissingField(&'static str),

    /// NaN or infinite field
    #[error("fix field {0} is not finite")]
    NonFinite(&'static str),

    /// Rejected runtime setting
    #[error("invalid sampler setting '{field}': {message}")]
    InvalidSetting {
        field: &'static str,
        message: String,
    },
}

impl SamplerError {
    pub(crate) fn setting(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            message: message.into(),
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SamplerError::NotValid(_) => "not_valid",
            SamplerError::MissingField(_) => "missing_field",
            SamplerError::NonFinite(_) => "non_finite",
            SamplerError::InvalidSetting { .. } => "invalid_setting",
        }
    }
}

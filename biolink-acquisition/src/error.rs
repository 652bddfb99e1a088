//! Error types for stream acquisition

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AcquisitionError>;

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("No stream source available: {0}")]
    SourceUnavailable(String),

    #[error("Failed to open stream '{stream}': {reason}")]
    Connection { stream: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Acquisition already running")]
    AlreadyRunning,

    #[error("Acquisition not running")]
    NotRunning,

    #[error("Acquisition task failed: {0}")]
    Internal(String),
}

impl AcquisitionError {
    pub fn connection<S: Into<String>, R: Into<String>>(stream: S, reason: R) -> Self {
        Self::Connection {
            stream: stream.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Stable outcome name reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "SourceUnavailableError",
            Self::Connection { .. } => "ConnectionError",
            Self::InvalidConfig(_) => "InvalidConfigError",
            Self::AlreadyRunning => "AlreadyRunningError",
            Self::NotRunning => "NotRunningError",
            Self::Internal(_) => "InternalError",
        }
    }
}

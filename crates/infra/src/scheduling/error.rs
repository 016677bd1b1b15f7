//! Scheduler error types

use auditbridge_domain::ForwarderError;
use thiserror::Error;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Invalid schedule or a configuration error raised by the pipeline;
    /// the daemon halts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl SchedulerError {
    /// Halt the daemon for a pipeline error that cannot be isolated to a tick.
    pub(crate) fn halt(err: &ForwarderError) -> Self {
        match err {
            ForwarderError::Configuration(message) => Self::Configuration(message.clone()),
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for SchedulerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoinFailed(err.to_string())
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

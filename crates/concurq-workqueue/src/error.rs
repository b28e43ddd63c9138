//! Dispatch errors.

use thiserror::Error;

/// Dispatcher and queue error types.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatcher no longer accepts work.
    #[error("Dispatcher is shutting down")]
    ShuttingDown,

    /// `start_workers` was called more than once.
    #[error("Worker pool already started")]
    WorkersAlreadyStarted,

    /// The queue was closed during shutdown.
    #[error("Queue is closed")]
    QueueClosed,

    /// Invalid construction-time configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome of a failed processing attempt.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// Retryable failure.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Unexpected failure; never retried.
    #[error("Unexpected error: {0}")]
    Fatal(String),
}

impl TaskError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Transient(_))
    }
}

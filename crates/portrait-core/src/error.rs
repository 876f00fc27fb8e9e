//! Orchestrator error types.

use thiserror::Error;

use portrait_queue::QueueError;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Submission request failed or was refused by the queue.
    #[error("Submission failed: {0}")]
    Transport(String),

    /// The job finished with a failure.
    #[error("Job failed: {0}")]
    RemoteJobFailure(String),

    /// The job was cancelled before it finished.
    #[error("Job cancelled")]
    Cancelled,

    /// The queue did not confirm a cancellation. Local state is cancelled anyway.
    #[error("Cancellation failed: {0}")]
    CancelFailed(String),

    #[error("Request superseded by a newer one")]
    Superseded,

    #[error("Orchestrator has shut down")]
    Shutdown,

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl OrchestratorError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn remote_job_failure(msg: impl Into<String>) -> Self {
        Self::RemoteJobFailure(msg.into())
    }

    pub fn cancel_failed(msg: impl Into<String>) -> Self {
        Self::CancelFailed(msg.into())
    }
}

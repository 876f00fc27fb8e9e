//! Queue client error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the queue's `error` field when it sent one.
    #[error("Queue returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueueError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status code, if the queue answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            QueueError::Status { status, .. } => Some(*status),
            QueueError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    ///
    /// For a non-2xx answer this is the queue's own explanation.
    pub fn user_message(&self) -> String {
        match self {
            QueueError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueueError::Network(_) => true,
            QueueError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

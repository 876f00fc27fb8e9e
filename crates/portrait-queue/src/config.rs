//! Queue client configuration.

use std::time::Duration;

use crate::error::{QueueError, QueueResult};

/// Default location of the job queue.
pub const DEFAULT_QUEUE_URL: &str = "http://localhost:5001";

/// Path of the sample video served by the queue host.
pub const DEFAULT_VIDEO_PATH: &str = "/video/sim.mp4";

/// Queue client configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Base URL of the job queue, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_QUEUE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl QueueConfig {
    /// Create config for the given base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let base_url = std::env::var("PORTRAIT_QUEUE_URL")
            .unwrap_or_else(|_| DEFAULT_QUEUE_URL.to_string());

        if base_url.trim().is_empty() {
            return Err(QueueError::config("PORTRAIT_QUEUE_URL cannot be empty"));
        }

        Ok(Self {
            base_url: normalize_base_url(base_url),
            request_timeout: Duration::from_secs(
                std::env::var("PORTRAIT_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("PORTRAIT_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }

    /// Sample video shown before anything has been generated.
    pub fn default_video_url(&self) -> String {
        format!("{}{}", self.base_url, DEFAULT_VIDEO_PATH)
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

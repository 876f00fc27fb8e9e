//! Orchestrator configuration.

use std::time::Duration;

use portrait_queue::QueueConfig;

use crate::error::OrchestratorResult;

/// Status polling policy.
///
/// Both ways a poll can fail to finish are bounded: a job that stays pending
/// runs into `max_poll_duration`, and failing status queries run into
/// `status_retries`.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status queries while the job is pending
    pub interval: Duration,
    /// Consecutive failed status queries tolerated before giving up
    pub status_retries: u32,
    /// Upper bound of the backoff between failed status queries
    pub retry_max_delay: Duration,
    /// How long a job may stay pending once polling started
    pub max_poll_duration: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            status_retries: 2,
            retry_max_delay: Duration::from_secs(10),
            max_poll_duration: Duration::from_secs(30 * 60),
        }
    }
}

impl PollConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_millis(
                std::env::var("PORTRAIT_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|ms| *ms > 0)
                    .unwrap_or(1000),
            ),
            status_retries: std::env::var("PORTRAIT_STATUS_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            retry_max_delay: Duration::from_secs(
                std::env::var("PORTRAIT_RETRY_MAX_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            max_poll_duration: Duration::from_secs(
                std::env::var("PORTRAIT_MAX_POLL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30 * 60),
            ),
        }
    }

    /// Delay before the next query after `failures` consecutive failures.
    ///
    /// Doubles from the poll interval, capped at `retry_max_delay` (but never
    /// below the interval itself).
    pub fn retry_delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        let delay = self.interval.saturating_mul(2u32.pow(exp));
        delay.min(self.retry_max_delay.max(self.interval))
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Job queue connection
    pub queue: QueueConfig,
    /// Status polling policy
    pub poll: PollConfig,
    /// Video shown before anything is generated
    pub default_video: String,
    /// Client identifier sent along with processing jobs
    pub client_uuid: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl OrchestratorConfig {
    /// Config for the given queue with default polling.
    pub fn new(queue: QueueConfig) -> Self {
        Self {
            default_video: queue.default_video_url(),
            queue,
            poll: PollConfig::default(),
            client_uuid: None,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> OrchestratorResult<Self> {
        let queue = QueueConfig::from_env()?;

        Ok(Self {
            default_video: std::env::var("PORTRAIT_DEFAULT_VIDEO")
                .unwrap_or_else(|_| queue.default_video_url()),
            queue,
            poll: PollConfig::from_env(),
            client_uuid: std::env::var("PORTRAIT_CLIENT_UUID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_client_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.client_uuid = Some(uuid.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_retry_delay_backs_off_and_caps() {
        let config = PollConfig {
            interval: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(config.retry_delay(1), Duration::from_secs(1));
        assert_eq!(config.retry_delay(2), Duration::from_secs(2));
        assert_eq!(config.retry_delay(3), Duration::from_secs(4));
        assert_eq!(config.retry_delay(4), Duration::from_secs(5));
        assert_eq!(config.retry_delay(40), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_delay_never_below_interval() {
        let config = PollConfig {
            interval: Duration::from_secs(3),
            retry_max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(config.retry_delay(5), Duration::from_secs(3));
    }

    #[test]
    fn test_default_video_follows_queue() {
        let config = OrchestratorConfig::new(QueueConfig::new("http://queue:5001"));
        assert_eq!(config.default_video, "http://queue:5001/video/sim.mp4");
        assert!(config.client_uuid.is_none());
    }

    #[test]
    #[serial]
    fn test_poll_config_from_env() {
        std::env::set_var("PORTRAIT_POLL_INTERVAL_MS", "250");
        std::env::set_var("PORTRAIT_STATUS_RETRIES", "0");
        std::env::remove_var("PORTRAIT_MAX_POLL_SECS");
        let config = PollConfig::from_env();
        std::env::remove_var("PORTRAIT_POLL_INTERVAL_MS");
        std::env::remove_var("PORTRAIT_STATUS_RETRIES");

        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.status_retries, 0);
        assert_eq!(config.max_poll_duration, Duration::from_secs(1800));
    }
}

//! Job status as reported by the remote queue, and the local job phase.

use serde::{Deserialize, Serialize};

/// Result payload of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobOutput {
    /// Quality labels offered by the source, in server order (e.g. "1080p", "720p")
    Qualities { qualities: Vec<String> },
    /// Locations of the generated clips, plus the worker's diagnostic output
    Videos {
        videos: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        script_output: Option<String>,
    },
}

impl JobOutput {
    pub fn qualities(qualities: Vec<String>) -> Self {
        Self::Qualities { qualities }
    }

    pub fn videos(videos: Vec<String>, script_output: Option<String>) -> Self {
        Self::Videos {
            videos,
            script_output,
        }
    }
}

/// Status of a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Still queued or running
    Pending,
    /// Finished with a result
    Success { output: JobOutput },
    /// Finished without a result
    Failure { reason: String },
}

impl JobStatus {
    pub fn success(output: JobOutput) -> Self {
        Self::Success { output }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Success { .. } => "success",
            JobStatus::Failure { .. } => "failure",
        }
    }
}

/// Local lifecycle of one job kind.
///
/// `Idle -> Submitting -> Polling -> {Succeeded | Failed | Cancelled}`, where
/// any phase may go back to `Submitting` when a new request supersedes the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobPhase {
    /// Submitting or polling.
    pub fn is_busy(&self) -> bool {
        matches!(self, JobPhase::Submitting | JobPhase::Polling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::failure("boom").is_terminal());
        assert!(JobStatus::success(JobOutput::qualities(vec![])).is_terminal());
    }

    #[test]
    fn test_phase_classification() {
        assert!(JobPhase::Submitting.is_busy());
        assert!(JobPhase::Polling.is_busy());
        assert!(!JobPhase::Idle.is_busy());
        assert!(!JobPhase::Cancelled.is_busy());
    }

    #[test]
    fn test_status_serialization() {
        let status = JobStatus::failure("disk full");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "FAILURE");
        assert_eq!(json["reason"], "disk full");
    }
}

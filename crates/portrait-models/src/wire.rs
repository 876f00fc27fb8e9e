//! Request and response bodies of the job queue HTTP API.
//!
//! Field names follow the queue's JSON exactly.

use serde::{Deserialize, Serialize};

use crate::job_status::{JobOutput, JobStatus};
use crate::task::TaskKind;

/// Body of `POST /api/get-video-options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoOptionsRequest {
    pub url: String,
}

/// Body of `POST /api/process-video`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVideoRequest {
    pub url: String,
    pub resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// Response of both submission endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_url: Option<String>,
}

/// Response of `GET /api/task-status/{task_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error body returned by the queue on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskStatusResponse {
    /// Interpret the raw status for a job of the given kind.
    ///
    /// Any state other than `SUCCESS` and `FAILURE` (`PENDING`, `STARTED`,
    /// `RETRY`, ...) is still running. A `SUCCESS` that explicitly reports
    /// `success: false` produced nothing and counts as a failure.
    pub fn into_status(self, kind: TaskKind) -> JobStatus {
        match self.state.to_ascii_uppercase().as_str() {
            "SUCCESS" if self.success == Some(false) => JobStatus::failure(
                self.error
                    .unwrap_or_else(|| "job reported no output".to_string()),
            ),
            "SUCCESS" => JobStatus::success(match kind {
                TaskKind::ResolutionDiscovery => {
                    JobOutput::qualities(self.qualities.unwrap_or_default())
                }
                TaskKind::VideoProcessing => {
                    JobOutput::videos(self.videos.unwrap_or_default(), self.script_output)
                }
            }),
            "FAILURE" => JobStatus::failure(self.error.unwrap_or_else(|| "job failed".to_string())),
            _ => JobStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TaskStatusResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_pending_like_states() {
        for state in ["PENDING", "STARTED", "RETRY", "PROGRESS"] {
            let resp = TaskStatusResponse {
                state: state.to_string(),
                ..Default::default()
            };
            assert_eq!(resp.into_status(TaskKind::VideoProcessing), JobStatus::Pending);
        }
    }

    #[test]
    fn test_discovery_success() {
        let resp = parse(r#"{"state":"SUCCESS","success":true,"qualities":["1080p","720p"]}"#);
        assert_eq!(
            resp.into_status(TaskKind::ResolutionDiscovery),
            JobStatus::success(JobOutput::qualities(vec!["1080p".into(), "720p".into()]))
        );
    }

    #[test]
    fn test_processing_success_keeps_script_output() {
        let resp = parse(
            r#"{"state":"SUCCESS","success":true,"videos":["http://x/a.mp4"],"script_output":"done"}"#,
        );
        assert_eq!(
            resp.into_status(TaskKind::VideoProcessing),
            JobStatus::success(JobOutput::videos(
                vec!["http://x/a.mp4".into()],
                Some("done".into())
            ))
        );
    }

    #[test]
    fn test_failure_reason_is_passed_through() {
        let resp = parse(r#"{"state":"FAILURE","error":"disk full"}"#);
        assert_eq!(
            resp.into_status(TaskKind::VideoProcessing),
            JobStatus::failure("disk full")
        );
    }

    #[test]
    fn test_failure_without_reason() {
        let resp = parse(r#"{"state":"FAILURE"}"#);
        assert_eq!(
            resp.into_status(TaskKind::ResolutionDiscovery),
            JobStatus::failure("job failed")
        );
    }

    #[test]
    fn test_unsuccessful_success_is_failure() {
        let resp = parse(r#"{"state":"SUCCESS","success":false}"#);
        assert_eq!(
            resp.into_status(TaskKind::VideoProcessing),
            JobStatus::failure("job reported no output")
        );
    }

    #[test]
    fn test_process_request_omits_missing_uuid() {
        let req = ProcessVideoRequest {
            url: "https://youtu.be/abc".into(),
            resolution: "720p".into(),
            uuid: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("uuid").is_none());
        assert_eq!(json["resolution"], "720p");
    }
}

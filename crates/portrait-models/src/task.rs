//! Task handles for jobs submitted to the remote queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote task identifier, as returned by the job queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Local sequence number of a submission attempt.
///
/// Allocated by the orchestrator for every URL change and every generate
/// request so that a submission answered after it was superseded can be told
/// apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    /// The request that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Probe a source video for its available qualities
    ResolutionDiscovery,
    /// Download, crop and transcode a source video into clips
    VideoProcessing,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ResolutionDiscovery => "resolution_discovery",
            TaskKind::VideoProcessing => "video_processing",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outstanding remote job.
///
/// Two handles are equal only if every field matches, so a resubmission that
/// happens to reuse a task id under a different request is still a different
/// handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    /// Remote task ID
    pub id: TaskId,
    /// Job kind
    pub kind: TaskKind,
    /// When the queue accepted the job
    pub submitted_at: DateTime<Utc>,
    /// Local request that produced this handle
    pub request: RequestId,
}

impl TaskHandle {
    /// Create a handle for a job accepted just now.
    pub fn new(id: impl Into<String>, kind: TaskKind, request: RequestId) -> Self {
        Self {
            id: TaskId::from_string(id),
            kind,
            submitted_at: Utc::now(),
            request,
        }
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

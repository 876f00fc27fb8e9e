//! Reconciliation events.
//!
//! Every change to the application state is described by one of these.
//! Components that observe I/O completions emit events; only the reconciler
//! turns them into state.

use serde::{Deserialize, Serialize};

use crate::job_status::JobStatus;
use crate::task::{RequestId, TaskHandle, TaskKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The user entered a new source URL; `request` is the discovery it starts
    UrlChanged { url: String, request: RequestId },
    /// The queue accepted a discovery job
    ResolutionSubmitted { request: RequestId, handle: TaskHandle },
    /// The discovery submission itself failed
    ResolutionSubmitFailed { request: RequestId, reason: String },
    /// Terminal status of a discovery job
    ResolutionStatus { handle: TaskHandle, status: JobStatus },
    /// The user picked a quality
    ResolutionSelected { resolution: String },
    /// The user asked for clips to be generated
    ProcessingRequested {
        request: RequestId,
        url: String,
        resolution: String,
    },
    /// The queue accepted a processing job
    ProcessingSubmitted { request: RequestId, handle: TaskHandle },
    /// The processing submission itself failed
    ProcessingSubmitFailed { request: RequestId, reason: String },
    /// Terminal status of a processing job
    ProcessingStatus { handle: TaskHandle, status: JobStatus },
    /// The user cancelled the processing job
    ProcessingCancelled { handle: TaskHandle },
    /// The queue refused or failed the remote cancel of a processing job
    ProcessingCancelFailed { handle: TaskHandle, reason: String },
    /// The user picked one of the generated clips
    VideoSelected { url: String },
    /// An existence probe finished
    ProbeResult { url: String, playable: bool },
}

impl Event {
    /// Status event for a handle, routed by its kind.
    pub fn status(handle: TaskHandle, status: JobStatus) -> Self {
        match handle.kind {
            TaskKind::ResolutionDiscovery => Event::ResolutionStatus { handle, status },
            TaskKind::VideoProcessing => Event::ProcessingStatus { handle, status },
        }
    }

    /// Submission event for a handle, routed by its kind.
    pub fn submitted(handle: TaskHandle) -> Self {
        let request = handle.request;
        match handle.kind {
            TaskKind::ResolutionDiscovery => Event::ResolutionSubmitted { request, handle },
            TaskKind::VideoProcessing => Event::ProcessingSubmitted { request, handle },
        }
    }

    /// Submission failure for a request of the given kind.
    pub fn submit_failed(kind: TaskKind, request: RequestId, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match kind {
            TaskKind::ResolutionDiscovery => Event::ResolutionSubmitFailed { request, reason },
            TaskKind::VideoProcessing => Event::ProcessingSubmitFailed { request, reason },
        }
    }

    /// Short name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Event::UrlChanged { .. } => "url_changed",
            Event::ResolutionSubmitted { .. } => "resolution_submitted",
            Event::ResolutionSubmitFailed { .. } => "resolution_submit_failed",
            Event::ResolutionStatus { .. } => "resolution_status",
            Event::ResolutionSelected { .. } => "resolution_selected",
            Event::ProcessingRequested { .. } => "processing_requested",
            Event::ProcessingSubmitted { .. } => "processing_submitted",
            Event::ProcessingSubmitFailed { .. } => "processing_submit_failed",
            Event::ProcessingStatus { .. } => "processing_status",
            Event::ProcessingCancelled { .. } => "processing_cancelled",
            Event::ProcessingCancelFailed { .. } => "processing_cancel_failed",
            Event::VideoSelected { .. } => "video_selected",
            Event::ProbeResult { .. } => "probe_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_routing_by_kind() {
        let handle = TaskHandle::new("t", TaskKind::ResolutionDiscovery, RequestId(3));
        let event = Event::status(handle.clone(), JobStatus::Pending);
        assert!(matches!(event, Event::ResolutionStatus { .. }));

        let event = Event::submitted(handle);
        assert_eq!(event.name(), "resolution_submitted");
        assert!(matches!(
            event,
            Event::ResolutionSubmitted { request: RequestId(3), .. }
        ));
    }

    #[test]
    fn test_submit_failed_routing() {
        let event = Event::submit_failed(TaskKind::VideoProcessing, RequestId(1), "refused");
        assert_eq!(
            event,
            Event::ProcessingSubmitFailed {
                request: RequestId(1),
                reason: "refused".into()
            }
        );
    }
}

//! Application state owned by the reconciler.

use serde::{Deserialize, Serialize};

use crate::job_status::JobPhase;
use crate::task::{RequestId, TaskHandle, TaskKind};

/// Lifecycle bookkeeping for one job kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTrack {
    /// Current phase
    pub phase: JobPhase,
    /// Latest local request for this kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestId>,
    /// Live handle; only set while polling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<TaskHandle>,
}

impl JobTrack {
    /// The live handle, if the job is being polled.
    pub fn active(&self) -> Option<&TaskHandle> {
        match self.phase {
            JobPhase::Polling => self.handle.as_ref(),
            _ => None,
        }
    }

    /// True if `handle` is the live handle of this track.
    pub fn is_active(&self, handle: &TaskHandle) -> bool {
        self.active() == Some(handle)
    }

    /// True if `request` is the submission this track is waiting on.
    pub fn awaits(&self, request: RequestId) -> bool {
        self.phase == JobPhase::Submitting && self.request == Some(request)
    }
}

/// Failure surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    pub kind: TaskKind,
    pub reason: String,
}

/// Authoritative application state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationState {
    /// Source URL most recently entered
    pub input_url: Option<String>,
    /// Qualities offered by the current source
    pub available_resolutions: Vec<String>,
    /// Chosen quality; always a member of `available_resolutions`
    pub selected_resolution: Option<String>,
    /// Clips produced by the last successful processing job
    pub generated_videos: Vec<String>,
    /// Diagnostic output of the last successful processing job
    pub script_output: Option<String>,
    /// Video shown in the player
    pub current_video: Option<String>,
    /// Set only by a successful probe of `current_video`
    pub current_video_confirmed_playable: bool,
    /// Candidate that becomes `current_video` once its probe succeeds
    pub pending_video: Option<String>,
    /// Last failure surfaced to the user
    pub last_failure: Option<FailureNotice>,
    pub resolution_job: JobTrack,
    pub processing_job: JobTrack,
}

impl ApplicationState {
    /// Initial state with a default video in the player.
    pub fn new(default_video: impl Into<String>) -> Self {
        Self {
            input_url: None,
            available_resolutions: Vec::new(),
            selected_resolution: None,
            generated_videos: Vec::new(),
            script_output: None,
            current_video: Some(default_video.into()),
            current_video_confirmed_playable: false,
            pending_video: None,
            last_failure: None,
            resolution_job: JobTrack::default(),
            processing_job: JobTrack::default(),
        }
    }

    pub fn is_submitting_resolution(&self) -> bool {
        self.resolution_job.phase.is_busy()
    }

    pub fn is_processing(&self) -> bool {
        self.processing_job.phase.is_busy()
    }

    pub fn active_processing_task(&self) -> Option<&TaskHandle> {
        self.processing_job.active()
    }

    pub fn active_resolution_task(&self) -> Option<&TaskHandle> {
        self.resolution_job.active()
    }

    pub fn track_mut(&mut self, kind: TaskKind) -> &mut JobTrack {
        match kind {
            TaskKind::ResolutionDiscovery => &mut self.resolution_job,
            TaskKind::VideoProcessing => &mut self.processing_job,
        }
    }

    /// Check the invariants that must hold after every reconciliation.
    pub fn invariants_hold(&self) -> bool {
        let selection_ok = self
            .selected_resolution
            .as_ref()
            .map_or(true, |s| self.available_resolutions.contains(s));
        let playable_ok = !self.current_video_confirmed_playable || self.current_video.is_some();
        let handles_ok = [&self.resolution_job, &self.processing_job]
            .iter()
            .all(|t| t.handle.is_none() || t.phase == JobPhase::Polling);

        selection_ok && playable_ok && handles_ok
    }
}

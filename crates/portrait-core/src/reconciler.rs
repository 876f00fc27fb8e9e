//! State reconciliation.
//!
//! `reconcile` is the only place application state changes. It is pure: I/O
//! that a transition needs is returned as [`Effect`]s for the runtime to run.

use portrait_models::{
    ApplicationState, Event, FailureNotice, JobOutput, JobPhase, JobStatus, JobTrack, RequestId,
    TaskHandle, TaskKind,
};

use crate::metrics;

/// I/O requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start polling this handle, replacing any poller of the same kind
    StartPolling(TaskHandle),
    /// Stop the poller of this kind, if any
    StopPolling(TaskKind),
    /// Check whether a video exists
    Probe(String),
    /// Best-effort remote cancel of a job nobody tracks anymore
    Abandon(TaskHandle),
}

/// Result of applying one event.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: ApplicationState,
    pub effects: Vec<Effect>,
    /// False if the event was stale or otherwise rejected
    pub applied: bool,
}

/// Apply `event` to `prior`.
///
/// A rejected event leaves the state untouched; it may still carry effects
/// (an orphaned processing submission is abandoned).
pub fn reconcile(prior: &ApplicationState, event: Event) -> Transition {
    let name = event.name();
    let mut state = prior.clone();
    let mut effects = Vec::new();

    let applied = match event {
        Event::UrlChanged { url, request } => {
            if is_older(&state.resolution_job, request) {
                false
            } else {
                if state.resolution_job.active().is_some() {
                    effects.push(Effect::StopPolling(TaskKind::ResolutionDiscovery));
                }
                state.available_resolutions.clear();
                state.selected_resolution = None;
                clear_failure(&mut state, TaskKind::ResolutionDiscovery);

                let phase = if url.trim().is_empty() {
                    state.input_url = None;
                    JobPhase::Idle
                } else {
                    state.input_url = Some(url);
                    JobPhase::Submitting
                };
                state.resolution_job = JobTrack {
                    phase,
                    request: Some(request),
                    handle: None,
                };
                true
            }
        }

        Event::ResolutionSubmitted { request, handle } => {
            if state.resolution_job.awaits(request) {
                start_polling(&mut state, &mut effects, handle);
                true
            } else {
                false
            }
        }

        Event::ResolutionSubmitFailed { request, reason } => {
            if state.resolution_job.awaits(request) {
                fail(&mut state, TaskKind::ResolutionDiscovery, reason);
                true
            } else {
                false
            }
        }

        Event::ResolutionStatus { handle, status } => {
            if !state.resolution_job.is_active(&handle) {
                false
            } else {
                match status {
                    JobStatus::Pending => false,
                    JobStatus::Success { output } => {
                        let qualities = match output {
                            JobOutput::Qualities { qualities } => qualities,
                            JobOutput::Videos { .. } => Vec::new(),
                        };
                        state.selected_resolution = qualities.first().cloned();
                        state.available_resolutions = qualities;
                        finish(&mut state, TaskKind::ResolutionDiscovery, JobPhase::Succeeded);
                        effects.push(Effect::StopPolling(TaskKind::ResolutionDiscovery));
                        true
                    }
                    JobStatus::Failure { reason } => {
                        state.available_resolutions.clear();
                        state.selected_resolution = None;
                        fail(&mut state, TaskKind::ResolutionDiscovery, reason);
                        effects.push(Effect::StopPolling(TaskKind::ResolutionDiscovery));
                        true
                    }
                }
            }
        }

        Event::ResolutionSelected { resolution } => {
            if state.available_resolutions.contains(&resolution) {
                state.selected_resolution = Some(resolution);
                true
            } else {
                false
            }
        }

        Event::ProcessingRequested { request, .. } => {
            if is_older(&state.processing_job, request) {
                false
            } else {
                if state.processing_job.active().is_some() {
                    effects.push(Effect::StopPolling(TaskKind::VideoProcessing));
                }
                clear_failure(&mut state, TaskKind::VideoProcessing);
                state.processing_job = JobTrack {
                    phase: JobPhase::Submitting,
                    request: Some(request),
                    handle: None,
                };
                true
            }
        }

        Event::ProcessingSubmitted { request, handle } => {
            if state.processing_job.awaits(request) {
                start_polling(&mut state, &mut effects, handle);
                true
            } else {
                effects.push(Effect::Abandon(handle));
                false
            }
        }

        Event::ProcessingSubmitFailed { request, reason } => {
            if state.processing_job.awaits(request) {
                fail(&mut state, TaskKind::VideoProcessing, reason);
                true
            } else {
                false
            }
        }

        Event::ProcessingStatus { handle, status } => {
            if !state.processing_job.is_active(&handle) {
                false
            } else {
                match status {
                    JobStatus::Pending => false,
                    JobStatus::Success { output } => {
                        let (videos, script_output) = match output {
                            JobOutput::Videos {
                                videos,
                                script_output,
                            } => (videos, script_output),
                            JobOutput::Qualities { .. } => (Vec::new(), None),
                        };
                        if let Some(first) = videos.first() {
                            state.pending_video = Some(first.clone());
                            effects.push(Effect::Probe(first.clone()));
                        }
                        state.generated_videos = videos;
                        state.script_output = script_output;
                        finish(&mut state, TaskKind::VideoProcessing, JobPhase::Succeeded);
                        effects.insert(0, Effect::StopPolling(TaskKind::VideoProcessing));
                        true
                    }
                    JobStatus::Failure { reason } => {
                        fail(&mut state, TaskKind::VideoProcessing, reason);
                        effects.push(Effect::StopPolling(TaskKind::VideoProcessing));
                        true
                    }
                }
            }
        }

        Event::ProcessingCancelled { handle } => {
            if state.processing_job.is_active(&handle) {
                finish(&mut state, TaskKind::VideoProcessing, JobPhase::Cancelled);
                effects.push(Effect::StopPolling(TaskKind::VideoProcessing));
                true
            } else {
                false
            }
        }

        Event::ProcessingCancelFailed { handle, reason } => {
            // A newer generate owns the failure slot now.
            if state.processing_job.request == Some(handle.request) {
                state.last_failure = Some(FailureNotice {
                    kind: TaskKind::VideoProcessing,
                    reason,
                });
                true
            } else {
                false
            }
        }

        Event::VideoSelected { url } => {
            if url.trim().is_empty() {
                false
            } else {
                state.pending_video = Some(url.clone());
                effects.push(Effect::Probe(url));
                true
            }
        }

        Event::ProbeResult { url, playable } => {
            if state.pending_video.as_deref() == Some(url.as_str()) {
                state.pending_video = None;
                if playable {
                    state.current_video = Some(url);
                    state.current_video_confirmed_playable = true;
                }
                true
            } else if state.current_video.as_deref() == Some(url.as_str()) {
                state.current_video_confirmed_playable = playable;
                true
            } else {
                false
            }
        }
    };

    if !applied {
        metrics::record_ignored_event(name);
        return Transition {
            state: prior.clone(),
            effects,
            applied,
        };
    }

    Transition {
        state,
        effects,
        applied,
    }
}

/// True if `request` predates the latest request of this track.
fn is_older(track: &JobTrack, request: RequestId) -> bool {
    track.request.map_or(false, |latest| request < latest)
}

fn start_polling(state: &mut ApplicationState, effects: &mut Vec<Effect>, handle: TaskHandle) {
    let track = state.track_mut(handle.kind);
    track.phase = JobPhase::Polling;
    track.handle = Some(handle.clone());
    effects.push(Effect::StartPolling(handle));
}

fn finish(state: &mut ApplicationState, kind: TaskKind, phase: JobPhase) {
    let track = state.track_mut(kind);
    track.phase = phase;
    track.handle = None;
}

fn fail(state: &mut ApplicationState, kind: TaskKind, reason: String) {
    finish(state, kind, JobPhase::Failed);
    state.last_failure = Some(FailureNotice { kind, reason });
}

fn clear_failure(state: &mut ApplicationState, kind: TaskKind) {
    if state.last_failure.as_ref().map_or(false, |f| f.kind == kind) {
        state.last_failure = None;
    }
}

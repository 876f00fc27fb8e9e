//! Job orchestration runtime.
//!
//! [`Orchestrator`] is a cloneable front handle. Every call is forwarded to a
//! single runtime task that owns the application state and the pollers, so
//! events are applied strictly in arrival order. Network calls run in spawned
//! tasks and report back as events.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use portrait_models::{
    ApplicationState, Event, JobPhase, ProcessVideoRequest, RequestId, TaskHandle, TaskKind,
    VideoOptionsRequest,
};
use portrait_queue::{HttpProber, HttpTaskQueue, ResourceProber, TaskQueue};

use crate::config::{OrchestratorConfig, PollConfig};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::metrics;
use crate::poller::{Poller, PollerHandle};
use crate::reconciler::{reconcile, Effect, Transition};

type GenerateReply = oneshot::Sender<OrchestratorResult<TaskHandle>>;

enum Command {
    UrlChanged {
        url: String,
    },
    SelectResolution {
        resolution: String,
    },
    Generate {
        url: String,
        resolution: String,
        reply: GenerateReply,
    },
    Cancel {
        reply: oneshot::Sender<OrchestratorResult<bool>>,
    },
    SelectVideo {
        url: String,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Front handle of the orchestration runtime.
#[derive(Clone)]
pub struct Orchestrator {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ApplicationState>,
}

impl Orchestrator {
    /// Spawn the runtime. Must be called inside a tokio runtime.
    pub fn start(
        config: OrchestratorConfig,
        queue: Arc<dyn TaskQueue>,
        prober: Arc<dyn ResourceProber>,
    ) -> Self {
        let initial = ApplicationState::new(config.default_video.clone());
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let runtime = Runtime {
            state: initial,
            publisher: state_tx,
            queue,
            prober,
            poll: config.poll,
            client_uuid: config.client_uuid,
            events: event_tx,
            pollers: HashMap::new(),
            generate_replies: HashMap::new(),
            last_request: RequestId(0),
        };

        info!(default_video = %config.default_video, "Starting orchestrator");
        tokio::spawn(runtime.run(command_rx, event_rx, config.default_video));

        Self {
            commands: command_tx,
            state: state_rx,
        }
    }

    /// Start with HTTP clients built from `config`.
    pub fn from_config(config: OrchestratorConfig) -> OrchestratorResult<Self> {
        let queue = Arc::new(HttpTaskQueue::new(&config.queue)?);
        let prober = Arc::new(HttpProber::new(&config.queue)?);
        Ok(Self::start(config, queue, prober))
    }

    /// Point the app at a new source video and discover its qualities.
    pub fn on_url_change(&self, url: impl Into<String>) -> OrchestratorResult<()> {
        self.send(Command::UrlChanged { url: url.into() })
    }

    /// Pick one of the discovered qualities. Unknown labels are ignored.
    pub fn on_resolution_change(&self, resolution: impl Into<String>) -> OrchestratorResult<()> {
        self.send(Command::SelectResolution {
            resolution: resolution.into(),
        })
    }

    /// Submit a processing job and start polling it.
    ///
    /// Resolves once the queue accepted or refused the job, not when the job
    /// finishes; use [`Orchestrator::wait_for_processing`] for that.
    pub async fn on_generate(&self, url: &str, resolution: &str) -> OrchestratorResult<TaskHandle> {
        if url.trim().is_empty() {
            return Err(OrchestratorError::validation("a video URL is required"));
        }
        if resolution.trim().is_empty() {
            return Err(OrchestratorError::validation("a resolution is required"));
        }

        let (reply, rx) = oneshot::channel();
        self.send(Command::Generate {
            url: url.to_string(),
            resolution: resolution.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| OrchestratorError::Shutdown)?
    }

    /// Cancel the active processing job.
    ///
    /// Returns `Ok(false)` if nothing was being processed. The job is
    /// cancelled locally even when the queue refuses; that refusal comes back
    /// as [`OrchestratorError::CancelFailed`].
    pub async fn on_cancel(&self) -> OrchestratorResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Cancel { reply })?;
        rx.await.map_err(|_| OrchestratorError::Shutdown)?
    }

    /// Show a generated video once a probe confirms it exists.
    pub fn on_select_generated_video(&self, url: impl Into<String>) -> OrchestratorResult<()> {
        self.send(Command::SelectVideo { url: url.into() })
    }

    /// Current state.
    pub fn snapshot(&self) -> ApplicationState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every applied event.
    pub fn subscribe(&self) -> watch::Receiver<ApplicationState> {
        self.state.clone()
    }

    /// Wait until the state satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ApplicationState) -> bool,
    ) -> OrchestratorResult<ApplicationState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| OrchestratorError::Shutdown)?;
        Ok(state.clone())
    }

    /// Wait until discovery for `url` has finished.
    ///
    /// A blank `url` never starts discovery; it settles once the input is
    /// cleared.
    pub async fn wait_for_resolutions(&self, url: &str) -> OrchestratorResult<ApplicationState> {
        let expected = if url.trim().is_empty() {
            None
        } else {
            Some(url)
        };
        self.wait_for(|s| s.input_url.as_deref() == expected && !s.is_submitting_resolution())
            .await
    }

    /// Wait until the job behind `handle` is no longer processing and any
    /// probe of its output has settled.
    pub async fn wait_for_processing(
        &self,
        handle: &TaskHandle,
    ) -> OrchestratorResult<ApplicationState> {
        let request = handle.request;
        self.wait_for(|s| {
            let settled = s.processing_job.request != Some(request) || !s.is_processing();
            settled && s.pending_video.is_none()
        })
        .await
    }

    /// Like [`Orchestrator::wait_for_processing`], but a job that did not
    /// succeed comes back as an error.
    pub async fn wait_for_outcome(&self, handle: &TaskHandle) -> OrchestratorResult<ApplicationState> {
        let state = self.wait_for_processing(handle).await?;

        if state.processing_job.request != Some(handle.request) {
            return Err(OrchestratorError::Superseded);
        }
        match state.processing_job.phase {
            JobPhase::Succeeded => Ok(state),
            JobPhase::Cancelled => Err(OrchestratorError::Cancelled),
            _ => {
                let reason = state
                    .last_failure
                    .as_ref()
                    .filter(|f| f.kind == TaskKind::VideoProcessing)
                    .map(|f| f.reason.clone())
                    .unwrap_or_else(|| "job failed".to_string());
                Err(OrchestratorError::remote_job_failure(reason))
            }
        }
    }

    /// Stop all pollers and the runtime.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, command: Command) -> OrchestratorResult<()> {
        self.commands
            .send(command)
            .map_err(|_| OrchestratorError::Shutdown)
    }
}

struct Runtime {
    state: ApplicationState,
    publisher: watch::Sender<ApplicationState>,
    queue: Arc<dyn TaskQueue>,
    prober: Arc<dyn ResourceProber>,
    poll: PollConfig,
    client_uuid: Option<String>,
    events: mpsc::UnboundedSender<Event>,
    pollers: HashMap<TaskKind, PollerHandle>,
    generate_replies: HashMap<RequestId, GenerateReply>,
    last_request: RequestId,
}

impl Runtime {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
        default_video: String,
    ) {
        self.execute(Effect::Probe(default_video));

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            break;
                        }
                    }
                    None => {
                        // Every front handle is gone.
                        self.stop();
                        break;
                    }
                },
                Some(event) = events.recv() => self.apply(event),
            }
        }

        info!("Orchestrator stopped");
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::UrlChanged { url } => {
                let request = self.next_request();
                self.apply(Event::UrlChanged {
                    url: url.clone(),
                    request,
                });
                if self.state.resolution_job.awaits(request) {
                    self.submit_discovery(request, url);
                }
            }
            Command::SelectResolution { resolution } => {
                self.apply(Event::ResolutionSelected { resolution });
            }
            Command::Generate {
                url,
                resolution,
                reply,
            } => {
                let request = self.next_request();
                self.generate_replies.insert(request, reply);
                self.apply(Event::ProcessingRequested {
                    request,
                    url: url.clone(),
                    resolution: resolution.clone(),
                });
                self.submit_processing(request, url, resolution);
            }
            Command::Cancel { reply } => match self.state.active_processing_task().cloned() {
                None => {
                    debug!("Cancel requested with no active processing job");
                    let _ = reply.send(Ok(false));
                }
                Some(handle) => {
                    self.apply(Event::ProcessingCancelled {
                        handle: handle.clone(),
                    });
                    self.cancel_remote(handle, reply);
                }
            },
            Command::SelectVideo { url } => {
                self.apply(Event::VideoSelected { url });
            }
            Command::Shutdown { reply } => {
                self.stop();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn apply(&mut self, event: Event) {
        let name = event.name();
        let submission = match &event {
            Event::ProcessingSubmitted { request, handle } => Some((*request, Ok(handle.clone()))),
            Event::ProcessingSubmitFailed { request, reason } => {
                Some((*request, Err(OrchestratorError::transport(reason.clone()))))
            }
            _ => None,
        };

        let Transition {
            state,
            effects,
            applied,
        } = reconcile(&self.state, event);

        if applied {
            debug!(event = name, "Applied event");
            self.state = state;
            debug_assert!(self.state.invariants_hold());
            self.publisher.send_replace(self.state.clone());
        } else {
            debug!(event = name, "Ignored stale event");
        }

        if let Some((request, outcome)) = submission {
            if let Some(reply) = self.generate_replies.remove(&request) {
                let _ = reply.send(if applied {
                    outcome
                } else {
                    Err(OrchestratorError::Superseded)
                });
            }
        }

        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartPolling(handle) => {
                if let Some(previous) = self.pollers.remove(&handle.kind) {
                    previous.cancel();
                }
                let kind = handle.kind;
                let poller = Poller::start(
                    handle,
                    self.queue.clone(),
                    self.poll.clone(),
                    self.events.clone(),
                );
                self.pollers.insert(kind, poller);
            }
            Effect::StopPolling(kind) => {
                if let Some(poller) = self.pollers.remove(&kind) {
                    poller.cancel();
                }
            }
            Effect::Probe(url) => {
                let prober = self.prober.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let playable = prober.probe(&url).await;
                    debug!(url = %url, playable, "Probe finished");
                    let _ = events.send(Event::ProbeResult { url, playable });
                });
            }
            Effect::Abandon(handle) => {
                let queue = self.queue.clone();
                tokio::spawn(async move {
                    match queue.cancel(&handle.id).await {
                        Ok(()) => {
                            metrics::record_cancellation(true);
                            info!(task_id = %handle.id, "Abandoned orphaned job");
                        }
                        Err(e) => {
                            metrics::record_cancellation(false);
                            warn!(task_id = %handle.id, error = %e, "Failed to abandon orphaned job");
                        }
                    }
                });
            }
        }
    }

    fn submit_discovery(&self, request: RequestId, url: String) {
        let queue = self.queue.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let body = VideoOptionsRequest { url };
            let event = match queue.submit_discovery(&body).await {
                Ok(id) => {
                    let handle = TaskHandle::new(id.0, TaskKind::ResolutionDiscovery, request);
                    info!(task_id = %handle.id, request = %request, "Discovery job submitted");
                    Event::submitted(handle)
                }
                Err(e) => {
                    warn!(request = %request, error = %e, "Discovery submission failed");
                    Event::submit_failed(TaskKind::ResolutionDiscovery, request, e.user_message())
                }
            };
            let _ = events.send(event);
        });
    }

    fn submit_processing(&self, request: RequestId, url: String, resolution: String) {
        let queue = self.queue.clone();
        let events = self.events.clone();
        let body = ProcessVideoRequest {
            url,
            resolution,
            uuid: self.client_uuid.clone(),
        };
        tokio::spawn(async move {
            let event = match queue.submit_processing(&body).await {
                Ok(id) => {
                    let handle = TaskHandle::new(id.0, TaskKind::VideoProcessing, request);
                    info!(
                        task_id = %handle.id,
                        request = %request,
                        resolution = %body.resolution,
                        "Processing job submitted"
                    );
                    Event::submitted(handle)
                }
                Err(e) => {
                    warn!(request = %request, error = %e, "Processing submission failed");
                    Event::submit_failed(TaskKind::VideoProcessing, request, e.user_message())
                }
            };
            let _ = events.send(event);
        });
    }

    fn cancel_remote(&self, handle: TaskHandle, reply: oneshot::Sender<OrchestratorResult<bool>>) {
        let queue = self.queue.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match queue.cancel(&handle.id).await {
                Ok(()) => {
                    metrics::record_cancellation(true);
                    info!(task_id = %handle.id, "Processing job cancelled");
                    Ok(true)
                }
                Err(e) => {
                    metrics::record_cancellation(false);
                    let reason = e.user_message();
                    warn!(task_id = %handle.id, error = %e, "Remote cancel failed");
                    let _ = events.send(Event::ProcessingCancelFailed {
                        handle,
                        reason: reason.clone(),
                    });
                    Err(OrchestratorError::cancel_failed(reason))
                }
            };
            let _ = reply.send(result);
        });
    }

    fn next_request(&mut self) -> RequestId {
        self.last_request = self.last_request.next();
        self.last_request
    }

    fn stop(&mut self) {
        for (_, poller) in self.pollers.drain() {
            poller.cancel();
        }
        self.generate_replies.clear();
    }
}

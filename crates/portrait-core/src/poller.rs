//! Status polling for one remote task.
//!
//! A poller is a spawned task that queries the queue at a fixed interval and
//! delivers exactly one terminal status event, unless it is cancelled first.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::Instrument;

use portrait_models::{Event, JobStatus, TaskHandle};
use portrait_queue::TaskQueue;

use crate::config::PollConfig;
use crate::logging::TaskLogger;
use crate::metrics;

/// Failure reason once the status query retry budget is spent.
pub const STATUS_QUERY_FAILED: &str = "status query failed";

/// Failure reason once a job stayed pending past `max_poll_duration`.
pub const POLL_TIMED_OUT: &str = "status polling timed out";

pub struct Poller;

impl Poller {
    /// Spawn a poller for `handle`. Its terminal status is sent on `events`.
    pub fn start(
        handle: TaskHandle,
        queue: Arc<dyn TaskQueue>,
        config: PollConfig,
        events: mpsc::UnboundedSender<Event>,
    ) -> PollerHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let logger = TaskLogger::new(&handle);
        let span = logger.create_span();

        let task = tokio::spawn(
            run(handle.clone(), queue, config, events, cancel_rx, logger).instrument(span),
        );

        PollerHandle {
            handle,
            cancel: cancel_tx,
            task: Some(task),
        }
    }
}

/// Owner of a running poller. Dropping it cancels the poller.
pub struct PollerHandle {
    handle: TaskHandle,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    /// Stop issuing queries. A response already in flight is discarded.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Wait for the poller task to exit.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

async fn run(
    handle: TaskHandle,
    queue: Arc<dyn TaskQueue>,
    config: PollConfig,
    events: mpsc::UnboundedSender<Event>,
    mut cancelled: watch::Receiver<bool>,
    logger: TaskLogger,
) {
    logger.log_start("polling status");

    let started = Instant::now();
    let mut failures = 0u32;
    let mut delay = config.interval;

    let status = loop {
        tokio::select! {
            biased;
            _ = cancelled.wait_for(|c| *c) => {
                logger.log_completion("polling cancelled");
                metrics::record_poll_outcome(handle.kind, "cancelled");
                return;
            }
            _ = sleep(delay) => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancelled.wait_for(|c| *c) => {
                logger.log_completion("polling cancelled during status query");
                metrics::record_poll_outcome(handle.kind, "cancelled");
                return;
            }
            result = queue.task_status(&handle.id, handle.kind) => result,
        };

        metrics::record_status_query(handle.kind, result.is_ok());

        match result {
            Ok(status) if status.is_terminal() => break status,
            Ok(_) => {
                failures = 0;
                delay = config.interval;
                if started.elapsed() >= config.max_poll_duration {
                    logger.log_error(&format!(
                        "still pending after {:?}",
                        config.max_poll_duration
                    ));
                    break JobStatus::failure(POLL_TIMED_OUT);
                }
            }
            Err(e) if !e.is_retryable() => {
                logger.log_error(&format!("status query rejected: {}", e));
                break JobStatus::failure(STATUS_QUERY_FAILED);
            }
            Err(e) => {
                failures += 1;
                if failures > config.status_retries {
                    logger.log_error(&format!("status query failed: {}", e));
                    break JobStatus::failure(STATUS_QUERY_FAILED);
                }
                delay = config.retry_delay(failures);
                logger.log_warning(&format!(
                    "status query failed (attempt {}/{}), retrying in {:?}: {}",
                    failures,
                    config.status_retries + 1,
                    delay,
                    e
                ));
            }
        }
    };

    // Cancellation may have landed while the last query was being handled.
    if *cancelled.borrow() {
        metrics::record_poll_outcome(handle.kind, "cancelled");
        return;
    }

    let outcome = match &status {
        JobStatus::Success { .. } => "success",
        _ => "failure",
    };
    metrics::record_poll_outcome(handle.kind, outcome);
    logger.log_completion(status.as_str());

    let _ = events.send(Event::status(handle, status));
}

//! Orchestration of remote video jobs.
//!
//! This crate provides:
//! - A pure reconciler that turns events into application state
//! - Status pollers with bounded retries and a polling deadline
//! - The orchestrator runtime that ties submissions, polling, probes and
//!   cancellation together
//! - Task logging and metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod reconciler;

pub use config::{OrchestratorConfig, PollConfig};
pub use error::{OrchestratorError, OrchestratorResult};
pub use logging::TaskLogger;
pub use orchestrator::Orchestrator;
pub use poller::{Poller, PollerHandle, POLL_TIMED_OUT, STATUS_QUERY_FAILED};
pub use reconciler::{reconcile, Effect, Transition};

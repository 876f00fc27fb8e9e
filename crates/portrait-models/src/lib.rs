//! Shared data models for the portrait clip orchestrator.
//!
//! This crate provides Serde-serializable types for:
//! - Task handles and job kinds
//! - Job status and local job phases
//! - Job queue request/response bodies
//! - Application state and reconciliation events

pub mod event;
pub mod job_status;
pub mod state;
pub mod task;
pub mod wire;

// Re-export common types
pub use event::Event;
pub use job_status::{JobOutput, JobPhase, JobStatus};
pub use state::{ApplicationState, FailureNotice, JobTrack};
pub use task::{RequestId, TaskHandle, TaskId, TaskKind};
pub use wire::{ErrorBody, ProcessVideoRequest, TaskResponse, TaskStatusResponse, VideoOptionsRequest};

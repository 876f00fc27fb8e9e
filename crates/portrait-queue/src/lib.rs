//! Client for the remote job queue.
//!
//! This crate provides:
//! - Job submission, status queries and cancellation over HTTP/JSON
//! - `HEAD`-based existence probes for generated videos
//! - Request metrics

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod probe;

pub use client::{HttpTaskQueue, TaskQueue};
pub use config::{QueueConfig, DEFAULT_QUEUE_URL};
pub use error::{QueueError, QueueResult};
pub use probe::{HttpProber, ResourceProber};

//! Structured task logging utilities.
//!
//! Provides consistent, structured logging for remote tasks with tracing
//! spans and contextual information.

use tracing::{error, info, warn, Span};

use portrait_models::TaskHandle;

/// Task logger carrying the task ID and kind on every line.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task_id: String,
    kind: &'static str,
}

impl TaskLogger {
    /// Create a new logger for a task.
    pub fn new(handle: &TaskHandle) -> Self {
        Self {
            task_id: handle.id.to_string(),
            kind: handle.kind.as_str(),
        }
    }

    /// Log the start of polling or another task operation.
    pub fn log_start(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            kind = %self.kind,
            "Task started: {}", message
        );
    }

    /// Log a warning while the task is tracked.
    pub fn log_warning(&self, message: &str) {
        warn!(
            task_id = %self.task_id,
            kind = %self.kind,
            "Task warning: {}", message
        );
    }

    /// Log a task failure.
    pub fn log_error(&self, message: &str) {
        error!(
            task_id = %self.task_id,
            kind = %self.kind,
            "Task error: {}", message
        );
    }

    /// Log the end of tracking, whatever the outcome.
    pub fn log_completion(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            kind = %self.kind,
            "Task completed: {}", message
        );
    }

    /// Create a tracing span for this task.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "task",
            task_id = %self.task_id,
            kind = %self.kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portrait_models::{RequestId, TaskKind};

    #[test]
    fn test_task_logger_fields() {
        let handle = TaskHandle::new("task-123", TaskKind::VideoProcessing, RequestId(1));
        let logger = TaskLogger::new(&handle);

        assert_eq!(logger.task_id, "task-123");
        assert_eq!(logger.kind, "video_processing");
    }
}

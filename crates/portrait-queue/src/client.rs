//! Job queue HTTP client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info_span, Instrument};

use portrait_models::{
    ErrorBody, JobStatus, ProcessVideoRequest, TaskId, TaskKind, TaskResponse,
    TaskStatusResponse, VideoOptionsRequest,
};

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::metrics::record_request;

/// Operations offered by the remote job queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submit a resolution discovery job for a source URL.
    async fn submit_discovery(&self, request: &VideoOptionsRequest) -> QueueResult<TaskId>;

    /// Submit a video processing job.
    async fn submit_processing(&self, request: &ProcessVideoRequest) -> QueueResult<TaskId>;

    /// Query the status of a job.
    async fn task_status(&self, task_id: &TaskId, kind: TaskKind) -> QueueResult<JobStatus>;

    /// Ask the queue to cancel a processing job.
    async fn cancel(&self, task_id: &TaskId) -> QueueResult<()>;
}

/// Job queue client over HTTP/JSON.
#[derive(Clone)]
pub struct HttpTaskQueue {
    http: Client,
    base_url: String,
}

impl HttpTaskQueue {
    /// Create a new queue client.
    pub fn new(config: &QueueConfig) -> QueueResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("portrait-queue/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn task_endpoint(&self, prefix: &str, task_id: &TaskId) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            prefix,
            urlencoding::encode(task_id.as_str())
        )
    }

    async fn execute_request<T, F>(&self, operation: &str, fut: F) -> QueueResult<T>
    where
        F: std::future::Future<Output = QueueResult<T>>,
    {
        let span = info_span!("queue_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn submit<B: serde::Serialize + Sync>(&self, url: String, body: &B) -> QueueResult<TaskId> {
        let response = self.http.post(&url).json(body).send().await?;
        let task: TaskResponse = Self::read_json(response).await?;

        if task.task_id.trim().is_empty() {
            return Err(QueueError::invalid_response(format!(
                "{} returned an empty task_id",
                url
            )));
        }

        debug!(task_id = %task.task_id, status = ?task.status, "Job accepted");
        Ok(TaskId::from_string(task.task_id))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> QueueResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Turn a non-2xx response into an error carrying the queue's own message.
    async fn handle_error_response(response: Response) -> QueueError {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("{} failed with {}", url, status));

        QueueError::status(status.as_u16(), message)
    }
}

#[async_trait]
impl TaskQueue for HttpTaskQueue {
    async fn submit_discovery(&self, request: &VideoOptionsRequest) -> QueueResult<TaskId> {
        let url = self.endpoint("/api/get-video-options");
        self.execute_request("submit_discovery", self.submit(url, request))
            .await
    }

    async fn submit_processing(&self, request: &ProcessVideoRequest) -> QueueResult<TaskId> {
        let url = self.endpoint("/api/process-video");
        self.execute_request("submit_processing", self.submit(url, request))
            .await
    }

    async fn task_status(&self, task_id: &TaskId, kind: TaskKind) -> QueueResult<JobStatus> {
        let url = self.task_endpoint("/api/task-status", task_id);

        self.execute_request("task_status", async {
            let response = self.http.get(&url).send().await?;
            let raw: TaskStatusResponse = Self::read_json(response).await?;
            debug!(task_id = %task_id, state = %raw.state, "Task status");
            Ok(raw.into_status(kind))
        })
        .await
    }

    async fn cancel(&self, task_id: &TaskId) -> QueueResult<()> {
        let url = self.task_endpoint("/api/cancel-process", task_id);

        self.execute_request("cancel", async {
            let response = self.http.post(&url).send().await?;
            if !response.status().is_success() {
                return Err(Self::handle_error_response(response).await);
            }
            Ok(())
        })
        .await
    }
}

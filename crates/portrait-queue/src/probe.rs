//! Existence probes for generated videos.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::QueueConfig;
use crate::error::QueueResult;
use crate::metrics::record_probe;

/// Checks whether a URL currently resolves to a retrievable resource.
#[async_trait]
pub trait ResourceProber: Send + Sync {
    /// True if `url` is retrievable right now. Never fails: any error means
    /// "not retrievable".
    async fn probe(&self, url: &str) -> bool;
}

/// Prober issuing a `HEAD` request, so no body is transferred.
#[derive(Clone)]
pub struct HttpProber {
    http: Client,
}

impl HttpProber {
    pub fn new(config: &QueueConfig) -> QueueResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("portrait-queue/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl ResourceProber for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        let playable = match self.http.head(url).send().await {
            Ok(response) => {
                debug!(url = %url, status = %response.status(), "Probe answered");
                response.status().is_success()
            }
            Err(e) => {
                debug!(url = %url, "Probe failed: {}", e);
                false
            }
        };

        record_probe(playable);
        playable
    }
}

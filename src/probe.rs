use async_trait::async_trait;
use chrono::Local;
use std::time::Instant;
use tracing::debug;

use crate::models::ProbeOutcome;
use crate::utils::error_chain;

/// Issues one check against one endpoint.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &str) -> ProbeOutcome;
}

/// Plain HTTP GET prober. Only transport errors count as failures; any
/// response, whatever its status, is a success.
#[derive(Debug, Clone, Default)]
pub struct HttpProber {
    http_client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &str) -> ProbeOutcome {
        let timestamp = Local::now();
        let start = Instant::now();
        let result = self.http_client.get(endpoint).send().await;
        let latency = start.elapsed();

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                // Body is never read; dropping the response releases the connection.
                drop(response);
                let outcome = ProbeOutcome::succeeded(endpoint, timestamp, latency, status);
                debug!(endpoint, status, latency_ms = outcome.latency_ms(), "probe answered");
                outcome
            }
            Err(e) => ProbeOutcome::failed(endpoint, timestamp, latency, error_chain(&e)),
        }
    }
}

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::NotificationSettings;
use crate::utils::error_chain;

/// Endpoint answering 204 whenever the internet is reachable.
pub const DEFAULT_CONNECTIVITY_URL: &str = "http://clients3.google.com/generate_204";

/// What happened to one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// No webhook configured.
    Disabled,
    /// Connectivity check failed; the alert was dropped.
    Offline,
    /// The webhook answered with this status.
    Sent { status: u16 },
    /// The POST itself failed.
    Failed(String),
}

/// Destination for alert messages. Delivery problems are reported through
/// [`Delivery`] and never as an error.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, message: &str) -> Delivery;
}

pub struct WebhookNotifier {
    settings: NotificationSettings,
    connectivity_url: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(settings: NotificationSettings) -> Self {
        Self {
            settings,
            connectivity_url: DEFAULT_CONNECTIVITY_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_connectivity_url(mut self, url: impl Into<String>) -> Self {
        self.connectivity_url = url.into();
        self
    }

    pub async fn is_connected(&self) -> bool {
        match self.http_client.get(&self.connectivity_url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(
                    url = %self.connectivity_url,
                    error = %error_chain(&e),
                    "connectivity check failed"
                );
                false
            }
        }
    }

    fn payload(&self, message: &str) -> serde_json::Value {
        serde_json::json!({
            "text": format!("{}: {}", message, self.settings.suffix)
        })
    }
}

#[async_trait]
impl AlertSink for WebhookNotifier {
    async fn notify(&self, message: &str) -> Delivery {
        let Some(url) = self.settings.webhook_url() else {
            debug!("webhook not configured, alert not sent");
            return Delivery::Disabled;
        };

        if !self.is_connected().await {
            error!(%message, "no network connectivity, dropping alert");
            return Delivery::Offline;
        }

        match self.http_client.post(url).json(&self.payload(message)).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    info!(status = status.as_u16(), "alert delivered");
                } else {
                    warn!(status = status.as_u16(), "webhook rejected alert");
                }
                Delivery::Sent {
                    status: status.as_u16(),
                }
            }
            Err(e) => {
                let detail = error_chain(&e);
                error!(error = %detail, "failed to post alert");
                Delivery::Failed(detail)
            }
        }
    }
}

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;

use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::ChatWebhook;

/// Posts JSON payloads to chat webhooks (Discord-style incoming webhooks).
pub struct WebhookClient {
    http: Client,
}

impl WebhookClient {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatWebhook for WebhookClient {
    fn deliver(&self, url: &str, payload: serde_json::Value) -> BoxFuture<'_, Result<()>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .http
                .post(&url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| NodeflowError::channel("webhook", e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(NodeflowError::channel(
                    "webhook",
                    format!(
                        "responded with {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("")
                    ),
                ));
            }

            debug!(status = status.as_u16(), "Webhook delivered");
            Ok(())
        })
    }
}

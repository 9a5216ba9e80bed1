use snoobot_core::CoreError;
use std::time::Duration;
use tracing::{info, warn};

/// Posts unsolicited messages to a group's webhook.
///
/// The body is a JSON list holding the single message text. Delivery is
/// attempted once.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub async fn deliver(&self, webhook: &str, text: &str) -> Result<(), CoreError> {
        let response = self
            .http
            .post(webhook)
            .json(&[text])
            .send()
            .await
            .map_err(|e| CoreError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Webhook {} answered {}", webhook, status);
            return Err(CoreError::WebhookRejected {
                status_code: status.as_u16(),
            });
        }

        info!("Delivered message to webhook {}", webhook);
        Ok(())
    }
}

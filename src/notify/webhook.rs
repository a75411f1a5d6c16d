use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use super::{Notifier, NotifyError};

/// Discord-style webhook endpoint: a bare URL accepting JSON posts.
pub struct DiscordWebhook {
    http: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    #[instrument(skip(self, content))]
    async fn send(&self, content: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "content": content }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }

        debug!("Webhook notification delivered");
        Ok(())
    }
}

use crate::domain::error::AppError;
use crate::domain::traits::{WebhookSink, WebhookTarget};
use crate::infrastructure::config::WebhookConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

const DELIVERY_HEADER: &str = "X-Delivery-Id";

/// Forwards form payloads to the configured webhook URLs.
pub struct HttpWebhook {
    client: Client,
    contact_url: String,
    new_lead_url: String,
}

impl HttpWebhook {
    pub fn new(client: Client, config: &WebhookConfig) -> Self {
        Self {
            client,
            contact_url: config.contact_url.clone(),
            new_lead_url: config.new_lead_url.clone(),
        }
    }

    fn url(&self, target: WebhookTarget) -> &str {
        match target {
            WebhookTarget::Contact => &self.contact_url,
            WebhookTarget::NewLead => &self.new_lead_url,
        }
    }
}

#[async_trait]
impl WebhookSink for HttpWebhook {
    async fn deliver(&self, target: WebhookTarget, payload: &Value) -> Result<u16, AppError> {
        let url = self.url(target);
        if url.is_empty() {
            return Err(AppError::Config(format!("No webhook URL configured for {target:?}")));
        }

        let delivery_id = Uuid::new_v4();
        debug!(%delivery_id, ?target, "forwarding payload to webhook");

        let response = self
            .client
            .post(url)
            .header(DELIVERY_HEADER, delivery_id.to_string())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%delivery_id, status = status.as_u16(), "webhook rejected payload");
        }
        Ok(status.as_u16())
    }
}

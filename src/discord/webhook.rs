//! Webhook delivery.
//!
//! A webhook is a pre-shared URL that accepts one rich message per POST.
//! Discord answers `204 No Content` (or `200` with `?wait=true`); anything
//! else is treated as a failed delivery.

use crate::error::{NotifyError, NotifyResult};
use crate::models::{Embed, WebhookPayload, COLOR_INFO};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default request timeout for webhook calls, in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Name single notifications post as.
pub const DEFAULT_USERNAME: &str = "MiningTaxes Bot";

const NOTIFICATION_FOOTER: &str = "MiningTaxes Notification System";

/// Something that can POST a payload to a webhook URL.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Send the payload and return the HTTP status code.
    async fn post(&self, url: &str, payload: &WebhookPayload) -> NotifyResult<u16>;
}

/// Webhook client backed by reqwest.
pub struct HttpWebhookClient {
    http_client: reqwest::Client,
}

impl HttpWebhookClient {
    /// Create a client with the given request timeout.
    pub fn new(timeout_seconds: u64) -> NotifyResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self::with_client(http_client))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn post(&self, url: &str, payload: &WebhookPayload) -> NotifyResult<u16> {
        let body = serde_json::to_string(payload)?;

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

/// Whether a webhook status code counts as delivered.
pub fn is_delivered(status: u16) -> bool {
    matches!(status, 200 | 204)
}

/// POST a payload and map non-delivery statuses to an error.
pub async fn deliver(
    client: &dyn WebhookClient,
    url: &str,
    payload: &WebhookPayload,
) -> NotifyResult<()> {
    let status = client.post(url, payload).await?;

    if is_delivered(status) {
        Ok(())
    } else {
        Err(NotifyError::UnexpectedStatus { status })
    }
}

/// A one-off channel notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub color: u32,
    /// Display name the webhook posts as.
    pub username: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            color: COLOR_INFO,
            username: DEFAULT_USERNAME.to_string(),
        }
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Build the webhook body for this notification.
    pub fn payload(&self) -> WebhookPayload {
        let embed = Embed::new(self.title.clone())
            .with_description(self.message.clone())
            .with_color(self.color)
            .with_footer(NOTIFICATION_FOOTER);

        WebhookPayload::single(self.username.clone(), embed)
    }
}

/// Send a notification to a webhook.
///
/// Returns `false` when no URL is given or delivery fails; failures are
/// logged, never returned.
pub async fn send_notification(
    client: &dyn WebhookClient,
    webhook_url: Option<&str>,
    notification: &Notification,
) -> bool {
    let url = match webhook_url.filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => return false,
    };

    match deliver(client, url, &notification.payload()).await {
        Ok(()) => {
            debug!("Successfully sent Discord notification: {}", notification.title);
            true
        }
        Err(NotifyError::UnexpectedStatus { status }) => {
            warn!("Failed to send Discord notification. Status: {}", status);
            false
        }
        Err(e) => {
            error!("Error sending Discord notification: {}", e);
            false
        }
    }
}

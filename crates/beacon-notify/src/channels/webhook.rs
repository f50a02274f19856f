use crate::channels::{post_json, required_url};
use crate::error::Result;
use crate::plugin::ChannelPlugin;
use crate::{Notification, NotificationChannel};
use async_trait::async_trait;
use beacon_common::types::ChannelType;
use serde_json::Value;

/// Generic webhook: POSTs the notification as JSON.
pub struct WebhookChannel {
    instance_id: String,
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(client: reqwest::Client, instance_id: &str, url: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            client,
            url: url.to_string(),
        }
    }
}

/// `{"alert": ..., "timestamp": ..., "source": ...}`
pub fn build_payload(notification: &Notification) -> Result<Value> {
    Ok(serde_json::to_value(notification)?)
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let payload = build_payload(notification)?;
        post_json(&self.client, "webhook", &self.url, None, &payload).await?;
        tracing::debug!(
            channel_id = %self.instance_id,
            alert_id = %notification.alert.id,
            "Webhook delivered"
        );
        Ok(())
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Webhook
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

// Plugin

#[derive(Default)]
pub struct WebhookPlugin {
    client: reqwest::Client,
}

impl WebhookPlugin {
    /// Channels created by this plugin share `client`'s connection pool.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ChannelPlugin for WebhookPlugin {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Webhook
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        required_url(config, "url").map(|_| ())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let url = required_url(config, "url")?;
        Ok(Box::new(WebhookChannel::new(
            self.client.clone(),
            instance_id,
            &url,
        )))
    }
}

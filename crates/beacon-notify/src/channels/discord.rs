use crate::channels::{post_json, required_url};
use crate::error::Result;
use crate::plugin::ChannelPlugin;
use crate::{Notification, NotificationChannel};
use async_trait::async_trait;
use beacon_common::types::{ChannelType, Severity};
use serde_json::{json, Value};

pub const COLOR_CRITICAL: u32 = 0xE7_4C_3C;
pub const COLOR_DEFAULT: u32 = 0xF3_9C_12;

/// Discord webhook delivering a single embed.
pub struct DiscordChannel {
    instance_id: String,
    client: reqwest::Client,
    url: String,
}

impl DiscordChannel {
    pub fn new(client: reqwest::Client, instance_id: &str, url: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            client,
            url: url.to_string(),
        }
    }
}

pub fn build_payload(notification: &Notification) -> Value {
    let alert = &notification.alert;
    let color = match alert.severity {
        Severity::Critical => COLOR_CRITICAL,
        _ => COLOR_DEFAULT,
    };
    json!({
        "embeds": [{
            "title": notification.title(),
            "description": alert.message,
            "color": color,
            "fields": [
                { "name": "Severity", "value": alert.severity.to_string(), "inline": true },
                { "name": "Current Value", "value": alert.current_value.to_string(), "inline": true },
                { "name": "Threshold", "value": alert.threshold.to_string(), "inline": true },
                { "name": "Time", "value": notification.timestamp.to_rfc3339(), "inline": false },
            ],
            "timestamp": notification.timestamp.to_rfc3339(),
            "footer": { "text": notification.source },
        }]
    })
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        post_json(
            &self.client,
            "discord",
            &self.url,
            None,
            &build_payload(notification),
        )
        .await
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Discord
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

// Plugin

#[derive(Default)]
pub struct DiscordPlugin {
    client: reqwest::Client,
}

impl DiscordPlugin {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ChannelPlugin for DiscordPlugin {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Discord
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
        Ok(Box::new(DiscordChannel::new(
            self.client.clone(),
            instance_id,
            &url,
        )))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = crate::utils::redact_sensitive_json(config);
        if redacted.get("url").is_some() {
            redacted["url"] = Value::String("***".to_string());
        }
        redacted
    }
}

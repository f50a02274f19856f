use crate::channels::{optional_str, post_json, required_url};
use crate::error::Result;
use crate::plugin::ChannelPlugin;
use crate::{Notification, NotificationChannel};
use async_trait::async_trait;
use beacon_common::types::{ChannelType, Severity};
use serde_json::{json, Value};

/// Slack incoming webhook.
pub struct SlackChannel {
    instance_id: String,
    client: reqwest::Client,
    url: String,
    channel: Option<String>,
    username: Option<String>,
}

impl SlackChannel {
    pub fn new(
        client: reqwest::Client,
        instance_id: &str,
        url: &str,
        channel: Option<String>,
        username: Option<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            client,
            url: url.to_string(),
            channel,
            username,
        }
    }
}

fn color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "danger",
        _ => "warning",
    }
}

/// Builds a single-attachment Slack message. `channel` and `username`
/// override the webhook defaults when present.
pub fn build_payload(
    notification: &Notification,
    channel: Option<&str>,
    username: Option<&str>,
) -> Value {
    let alert = &notification.alert;
    let mut payload = json!({
        "attachments": [{
            "color": color(alert.severity),
            "title": notification.title(),
            "text": alert.message,
            "fields": [
                { "title": "Severity", "value": alert.severity.to_string(), "short": true },
                { "title": "Current Value", "value": alert.current_value.to_string(), "short": true },
                { "title": "Threshold", "value": alert.threshold.to_string(), "short": true },
                { "title": "Time", "value": notification.timestamp.to_rfc3339(), "short": true },
            ],
            "footer": notification.source,
            "ts": notification.timestamp.timestamp(),
        }]
    });
    if let Some(channel) = channel {
        payload["channel"] = Value::String(channel.to_string());
    }
    if let Some(username) = username {
        payload["username"] = Value::String(username.to_string());
    }
    payload
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let payload = build_payload(
            notification,
            self.channel.as_deref(),
            self.username.as_deref(),
        );
        post_json(&self.client, "slack", &self.url, None, &payload).await
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Slack
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

// Plugin

#[derive(Default)]
pub struct SlackPlugin {
    client: reqwest::Client,
}

impl SlackPlugin {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ChannelPlugin for SlackPlugin {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Slack
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
        Ok(Box::new(SlackChannel::new(
            self.client.clone(),
            instance_id,
            &url,
            optional_str(config, "channel"),
            optional_str(config, "username"),
        )))
    }

    // The webhook URL embeds the Slack secret.
    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = crate::utils::redact_sensitive_json(config);
        if redacted.get("url").is_some() {
            redacted["url"] = Value::String("***".to_string());
        }
        redacted
    }
}

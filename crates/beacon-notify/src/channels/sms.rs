use crate::channels::{optional_str, post_json, required_url};
use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::{Notification, NotificationChannel};
use async_trait::async_trait;
use beacon_common::types::ChannelType;
use serde_json::{json, Value};

/// SMS notifications. With a `gateway_url` the text is POSTed to the
/// gateway as `{"to", "message"}`; otherwise it is only logged.
pub struct SmsChannel {
    instance_id: String,
    client: reqwest::Client,
    phone_number: String,
    gateway_url: Option<String>,
    api_key: Option<String>,
}

impl SmsChannel {
    pub fn new(
        client: reqwest::Client,
        instance_id: &str,
        phone_number: &str,
        gateway_url: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            client,
            phone_number: phone_number.to_string(),
            gateway_url,
            api_key,
        }
    }
}

pub fn format_message(notification: &Notification) -> String {
    let alert = &notification.alert;
    format!(
        "[{source}][{severity}] {rule}: {message}",
        source = notification.source,
        severity = alert.severity,
        rule = alert.rule_name,
        message = alert.message,
    )
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let message = format_message(notification);
        match &self.gateway_url {
            Some(url) => {
                let payload = json!({ "to": self.phone_number, "message": message });
                post_json(&self.client, "sms", url, self.api_key.as_deref(), &payload).await
            }
            None => {
                tracing::info!(
                    channel_id = %self.instance_id,
                    to = %self.phone_number,
                    message = %message,
                    "SMS notification queued"
                );
                Ok(())
            }
        }
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Sms
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

// Plugin

fn phone_number(config: &Value) -> Result<String> {
    let phone = optional_str(config, "phone_number")
        .ok_or_else(|| NotifyError::InvalidConfig("missing 'phone_number'".to_string()))?;
    let digits = phone.strip_prefix('+').unwrap_or(&phone);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return Err(NotifyError::InvalidConfig(format!(
            "invalid phone number '{phone}'"
        )));
    }
    Ok(phone)
}

fn gateway_url(config: &Value) -> Result<Option<String>> {
    match config.get("gateway_url") {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_url(config, "gateway_url").map(Some),
    }
}

#[derive(Default)]
pub struct SmsPlugin {
    client: reqwest::Client,
}

impl SmsPlugin {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ChannelPlugin for SmsPlugin {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Sms
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        phone_number(config)?;
        gateway_url(config)?;
        Ok(())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(SmsChannel::new(
            self.client.clone(),
            instance_id,
            &phone_number(config)?,
            gateway_url(config)?,
            optional_str(config, "api_key"),
        )))
    }
}

use crate::error::{NotifyError, Result};
use crate::NotificationChannel;
use beacon_common::types::ChannelType;
use serde_json::Value;
use std::collections::HashMap;

/// Factory for creating [`NotificationChannel`] instances from a stored
/// channel's JSON configuration.
///
/// Each plugin is registered in the [`ChannelRegistry`] under its
/// `channel_type()`. The dispatcher validates and instantiates channels
/// through the matching plugin on every dispatch.
pub trait ChannelPlugin: Send + Sync {
    fn channel_type(&self) -> ChannelType;

    /// Validates a JSON config blob against this plugin's expected schema.
    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Creates a configured channel instance from a validated JSON config.
    /// `instance_id` is the database row ID of the channel record.
    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>>;

    /// Returns a copy of `config` safe to write to logs.
    fn redact_config(&self, config: &Value) -> Value {
        crate::utils::redact_sensitive_json(config)
    }
}

/// Registry of available [`ChannelPlugin`]s.
///
/// # Examples
///
/// ```
/// use beacon_common::types::ChannelType;
/// use beacon_notify::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::default();
/// for ty in ChannelType::ALL {
///     assert!(registry.has_plugin(ty));
/// }
/// assert!(!beacon_notify::plugin::ChannelRegistry::new().has_plugin(ChannelType::Slack));
/// ```
pub struct ChannelRegistry {
    plugins: HashMap<ChannelType, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Registers a plugin, replacing any previous plugin for the same type.
    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        self.plugins.insert(plugin.channel_type(), plugin);
    }

    pub fn create_channel(
        &self,
        channel_type: ChannelType,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let plugin = self
            .plugins
            .get(&channel_type)
            .ok_or_else(|| NotifyError::UnknownChannelType(channel_type.to_string()))?;
        plugin.validate_config(config)?;
        plugin.create_channel(instance_id, config)
    }

    pub fn get_plugin(&self, channel_type: ChannelType) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(&channel_type).map(|p| p.as_ref())
    }

    pub fn has_plugin(&self, channel_type: ChannelType) -> bool {
        self.plugins.contains_key(&channel_type)
    }

    /// Registered channel types in a stable order.
    pub fn channel_types(&self) -> Vec<ChannelType> {
        let mut types: Vec<ChannelType> = self.plugins.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

impl ChannelRegistry {
    /// Registers the built-in channel types. The HTTP-based channels all send
    /// through `client`, so connections are pooled across dispatches.
    pub fn with_http_client(client: reqwest::Client) -> Self {
        use crate::channels::{discord, email, slack, sms, webhook};

        let mut registry = Self::new();
        registry.register(Box::new(webhook::WebhookPlugin::new(client.clone())));
        registry.register(Box::new(slack::SlackPlugin::new(client.clone())));
        registry.register(Box::new(discord::DiscordPlugin::new(client.clone())));
        registry.register(Box::new(email::EmailPlugin));
        registry.register(Box::new(sms::SmsPlugin::new(client)));
        registry
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::with_http_client(reqwest::Client::new())
    }
}

use std::time::Duration;

/// Errors that can occur within the notification subsystem.
///
/// Every variant describes a failure of one channel. The dispatcher logs it
/// with the channel identity and carries on with the remaining channels.
///
/// # Examples
///
/// ```rust
/// use beacon_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing url".to_string());
/// assert!(err.to_string().contains("url"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Channel configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// The channel type has no registered plugin.
    #[error("Notify: unknown channel type '{0}'")]
    UnknownChannelType(String),

    /// An HTTP request to an external notification endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("Notify: JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The external endpoint returned a non-success response.
    #[error("Notify: API error from {service}: status={status}, body={body}")]
    ApiError {
        service: String,
        status: u16,
        body: String,
    },

    /// Delivery did not finish within the configured bound.
    #[error("Notify: delivery timed out after {0:?}")]
    Timeout(Duration),

    /// Channel records could not be loaded.
    #[error("Notify: channel lookup failed: {0}")]
    ChannelLookup(String),
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

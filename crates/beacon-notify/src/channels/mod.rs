pub mod discord;
pub mod email;
pub mod slack;
pub mod sms;
pub mod webhook;

use crate::error::{NotifyError, Result};
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use serde::Serialize;
use serde_json::Value;

/// Reads a required `http(s)` URL from a channel config.
pub(crate) fn required_url(config: &Value, key: &str) -> Result<String> {
    let url = config
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NotifyError::InvalidConfig(format!("missing '{key}'")))?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(NotifyError::InvalidConfig(format!(
            "'{key}' must be an http(s) URL, got '{url}'"
        )));
    }
    Ok(url.to_string())
}

pub(crate) fn optional_str(config: &Value, key: &str) -> Option<String> {
    config
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// POSTs a JSON body and maps any non-2xx status to [`NotifyError::ApiError`].
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    service: &str,
    url: &str,
    bearer: Option<&str>,
    body: &T,
) -> Result<()> {
    let mut req = client.post(url).json(body);
    if let Some(token) = bearer {
        req = req.bearer_auth(token);
    }
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = match resp.text().await {
        Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
        Err(e) => format!("[failed to read response body: {e}]"),
    };
    Err(NotifyError::ApiError {
        service: service.to_string(),
        status: status.as_u16(),
        body,
    })
}

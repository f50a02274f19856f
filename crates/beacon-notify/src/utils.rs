//! Helpers shared by the notification channels.

use serde_json::Value;

pub use beacon_common::text::truncate_string;

/// Upper bound on response bodies carried in errors and logs.
pub const MAX_BODY_LENGTH: usize = 4000;

/// Replaces the values of secret-looking keys with `"***"`, recursively.
///
/// A key is treated as secret when it contains password, passwd, pwd, token,
/// secret, api_key, apikey or credentials (case-insensitive).
pub fn redact_sensitive_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let key_lower = key.to_lowercase();
                let is_sensitive = [
                    "password",
                    "passwd",
                    "pwd",
                    "token",
                    "secret",
                    "api_key",
                    "apikey",
                    "credentials",
                ]
                .iter()
                .any(|needle| key_lower.contains(needle));

                if is_sensitive {
                    redacted.insert(key.clone(), Value::String("***".to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_json(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(redact_sensitive_json).collect()),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_sensitive_json() {
        let json = serde_json::json!({
            "phone_number": "+15550100",
            "api_key": "abc123",
            "gateway_url": "https://sms.example.com",
            "nested": {
                "access_token": "xyz789",
                "public_value": "visible"
            }
        });

        let redacted = redact_sensitive_json(&json);
        assert_eq!(redacted["phone_number"], "+15550100");
        assert_eq!(redacted["api_key"], "***");
        assert_eq!(redacted["gateway_url"], "https://sms.example.com");
        assert_eq!(redacted["nested"]["access_token"], "***");
        assert_eq!(redacted["nested"]["public_value"], "visible");
    }
}

use async_trait::async_trait;
use beacon_common::text::truncate_string;
use serde_json::Value;

use super::{MetricQueryExecutor, QueryExecutionError, Row};

/// Maximum number of response body bytes kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Sends rule queries to a remote query execution endpoint.
///
/// The request is `POST {endpoint}` with `{"query": "..."}`. The response is
/// either a JSON array of row objects or an object with a `rows` array.
pub struct HttpQueryExecutor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpQueryExecutor {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key,
        }
    }
}

pub(crate) fn parse_rows(body: Value) -> Result<Vec<Row>, QueryExecutionError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("rows") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(QueryExecutionError::InvalidResponse(
                    "object response without a `rows` array".to_string(),
                ))
            }
        },
        other => {
            return Err(QueryExecutionError::InvalidResponse(format!(
                "expected array or object, got {other}"
            )))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            other => Err(QueryExecutionError::InvalidResponse(format!(
                "row is not an object: {other}"
            ))),
        })
        .collect()
}

#[async_trait]
impl MetricQueryExecutor for HttpQueryExecutor {
    async fn run(&self, query: &str) -> Result<Vec<Row>, QueryExecutionError> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": query }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QueryExecutionError::Api {
                status: status.as_u16(),
                body: truncate_string(&body, MAX_ERROR_BODY),
            });
        }

        let body: Value = resp.json().await?;
        parse_rows(body)
    }
}

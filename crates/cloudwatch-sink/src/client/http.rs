//! HTTP implementation of the backend interface.
//!
//! Speaks the JSON-1.1 wire protocol: every operation is a `POST` to the
//! endpoint root with an `X-Amz-Target: Logs_20140328.<Operation>` header
//! and a JSON body. Error responses are discriminated by the `__type`
//! field of the error body and mapped onto [`ClientError`].
//!
//! Request signing is out of scope; the client forwards caller-supplied
//! static headers and is aimed at gateways and emulators that accept them.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::warn;

use super::{ClientError, CloudWatchLogs, LogStream, PutLogEventsResponse};
use crate::record::InputLogEvent;

const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE_JSON_1_1: &str = "application/x-amz-json-1.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-1.1 client for a CloudWatch-compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client for the given endpoint URL.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpClient {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Adds a static header sent with every request.
    ///
    /// Invalid header names or values are reported and skipped; the client
    /// stays usable.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!("SINK | ignoring invalid static header {name:?}"),
        }
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(&self, operation: &str, body: Value) -> Result<Value, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_1_1)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if status.is_success() {
            if text.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text)
                .map_err(|e| ClientError::Transport(format!("malformed response body: {e}")))
        } else {
            Err(classify_error(status, &text))
        }
    }
}

/// Maps an error response onto the typed failure classes.
///
/// The `__type` field may be namespaced (`com.amazonaws.logs#...`); only
/// the suffix after the last `#` is significant. Untyped server errors are
/// treated as transient.
fn classify_error(status: StatusCode, body: &str) -> ClientError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error_type = parsed
        .get("__type")
        .and_then(Value::as_str)
        .and_then(|t| t.rsplit('#').next())
        .unwrap_or("");
    let message = parsed
        .get("message")
        .or_else(|| parsed.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or(body)
        .to_string();

    match error_type {
        "ServiceUnavailableException" => ClientError::ServiceUnavailable(message),
        "ResourceNotFoundException" => ClientError::ResourceNotFound(message),
        "InvalidSequenceTokenException" => ClientError::InvalidSequenceToken(message),
        "DataAlreadyAcceptedException" => ClientError::DataAlreadyAccepted(message),
        "InvalidParameterException" => ClientError::InvalidParameter(message),
        _ if status.is_server_error() => ClientError::ServiceUnavailable(message),
        _ => ClientError::Transport(format!("{status}: {message}")),
    }
}

#[async_trait::async_trait]
impl CloudWatchLogs for HttpClient {
    async fn describe_log_groups(&self, name_prefix: &str) -> Result<Vec<String>, ClientError> {
        let response = self
            .call(
                "DescribeLogGroups",
                json!({ "logGroupNamePrefix": name_prefix }),
            )
            .await?;

        let groups = response
            .get("logGroups")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|g| g.get("logGroupName").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(groups)
    }

    async fn create_log_group(&self, name: &str) -> Result<(), ClientError> {
        self.call("CreateLogGroup", json!({ "logGroupName": name }))
            .await?;
        Ok(())
    }

    async fn put_retention_policy(&self, name: &str, days: i32) -> Result<(), ClientError> {
        self.call(
            "PutRetentionPolicy",
            json!({ "logGroupName": name, "retentionInDays": days }),
        )
        .await?;
        Ok(())
    }

    async fn describe_log_streams(
        &self,
        group: &str,
        name_prefix: &str,
    ) -> Result<Vec<LogStream>, ClientError> {
        let response = self
            .call(
                "DescribeLogStreams",
                json!({ "logGroupName": group, "logStreamNamePrefix": name_prefix }),
            )
            .await?;

        let streams = response
            .get("logStreams")
            .and_then(Value::as_array)
            .map(|streams| {
                streams
                    .iter()
                    .filter_map(|s| {
                        let name = s.get("logStreamName").and_then(Value::as_str)?;
                        let sequence_token = s
                            .get("uploadSequenceToken")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        Some(LogStream {
                            name: name.to_string(),
                            sequence_token,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(streams)
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ClientError> {
        self.call(
            "CreateLogStream",
            json!({ "logGroupName": group, "logStreamName": stream }),
        )
        .await?;
        Ok(())
    }

    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        sequence_token: Option<&str>,
        events: &[InputLogEvent],
    ) -> Result<PutLogEventsResponse, ClientError> {
        let log_events: Vec<Value> = events
            .iter()
            .map(|e| json!({ "timestamp": e.timestamp.timestamp_millis(), "message": e.message }))
            .collect();

        let mut body = json!({
            "logGroupName": group,
            "logStreamName": stream,
            "logEvents": log_events,
        });
        if let (Some(token), Some(map)) = (sequence_token, body.as_object_mut()) {
            map.insert("sequenceToken".to_string(), Value::String(token.to_string()));
        }

        let response = self.call("PutLogEvents", body).await?;
        let next_sequence_token = response
            .get("nextSequenceToken")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(PutLogEventsResponse {
            next_sequence_token,
        })
    }
}

//! HTTP transport for the remote coordination service

use crate::error::EngineError;
use crate::platform::{CoordinationClient, RemoteOperation, RemoteParams};
use async_trait::async_trait;
use journey_live_core::config::RemoteConfig;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Longest response body excerpt carried in an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Coordination client that POSTs JSON to `{base_url}/{operation}`.
#[derive(Debug, Clone)]
pub struct HttpCoordinationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCoordinationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Platform {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build a client when a base URL is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, EngineError> {
        match &config.base_url {
            Some(url) => Self::new(url.clone(), Duration::from_secs(config.timeout_secs)).map(Some),
            None => Ok(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, operation: RemoteOperation) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), operation.as_str())
    }
}

#[async_trait]
impl CoordinationClient for HttpCoordinationClient {
    async fn call(
        &self,
        operation: RemoteOperation,
        params: RemoteParams,
    ) -> Result<Value, EngineError> {
        let url = self.endpoint(operation);
        debug!(operation = %operation, url = %url, "Calling coordination service");

        let response = self
            .client
            .post(&url)
            .json(&Value::Object(params))
            .send()
            .await
            .map_err(|e| EngineError::Remote {
                operation,
                message: "request failed".to_string(),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| EngineError::Remote {
            operation,
            message: "failed to read response body".to_string(),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let excerpt: String = String::from_utf8_lossy(&body)
                .chars()
                .take(ERROR_BODY_LIMIT)
                .collect();
            return Err(EngineError::remote(
                operation,
                format!("server returned {status}: {excerpt}"),
            ));
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| EngineError::Remote {
            operation,
            message: "invalid JSON response".to_string(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn test_endpoint_joins_base_and_operation() {
        let client =
            HttpCoordinationClient::new("https://coord.example/api/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.endpoint(RemoteOperation::ScheduleStateUpdates),
            "https://coord.example/api/scheduleStateUpdates"
        );
    }

    #[test]
    fn test_from_config_without_url() {
        assert!(
            HttpCoordinationClient::from_config(&RemoteConfig::default())
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_posts_params_and_decodes_json() {
        let (base, server) = serve_once("HTTP/1.1 200 OK", r#"{"scheduled":true}"#).await;
        let client = HttpCoordinationClient::new(base, Duration::from_secs(5)).unwrap();

        let mut params = RemoteParams::new();
        params.insert("activityId".to_string(), json!("a1"));
        let value = client
            .call(RemoteOperation::ScheduleArrivalAlert, params)
            .await
            .unwrap();
        assert_eq!(value, json!({ "scheduled": true }));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /scheduleArrivalAlert "));
        assert!(request.contains(r#""activityId":"a1""#));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let (base, _server) = serve_once("HTTP/1.1 200 OK", "").await;
        let client = HttpCoordinationClient::new(base, Duration::from_secs(5)).unwrap();
        let value = client
            .call(RemoteOperation::RegisterLiveActivityToken, RemoteParams::new())
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_remote_error() {
        let (base, _server) =
            serve_once("HTTP/1.1 503 Service Unavailable", r#"{"error":"busy"}"#).await;
        let client = HttpCoordinationClient::new(base, Duration::from_secs(5)).unwrap();
        let err = client
            .call(RemoteOperation::RegisterLiveActivityStartToken, RemoteParams::new())
            .await
            .unwrap_err();
        match err {
            EngineError::Remote { operation, message, .. } => {
                assert_eq!(operation, RemoteOperation::RegisterLiveActivityStartToken);
                assert!(message.contains("503"));
                assert!(message.contains("busy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//! reqwest-backed gateway.
//!
//! Policy owned here:
//! - every JSON call runs under one hard deadline; expiry is `Timeout`
//! - transport failures (DNS, refused connection) become `Network` with a
//!   stable message
//! - non-2xx answers become `Http { code, message }`, taking `message` from
//!   a JSON body when there is one and the status text otherwise
//! - no retries

use std::time::{Duration, Instant};

use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use taskdeck_protocol::{
    output_endpoint, status_endpoint, stop_endpoint, Ack, CleanupResponse, GatewayError,
    LaunchRequest, LaunchResponse, OutputResponse, TaskDetail, TaskListResponse,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS, ENDPOINT_CLEANUP, ENDPOINT_RUN,
    ENDPOINT_TASKS,
};

use crate::gateway::{Gateway, GatewayFuture, ProbeReply};

/// Gateway that talks to a real worker over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpGateway {
    pub fn new(request_timeout: Duration, probe_timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, request_timeout, probe_timeout })
    }

    pub fn with_defaults() -> Result<Self, GatewayError> {
        Self::new(
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Issue one JSON call and decode the 2xx body into `T`.
    async fn call<T: DeserializeOwned>(
        &self,
        base: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, GatewayError> {
        let url = join_url(base, endpoint);
        tracing::debug!(%method, %url, "API request");

        let mut builder = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let exchange = async {
            let response = builder.send().await.map_err(normalize_transport)?;
            if !response.status().is_success() {
                return Err(http_error(response).await);
            }
            let bytes = response.bytes().await.map_err(normalize_transport)?;
            serde_json::from_slice::<T>(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
        };

        let result = match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };
        if let Err(e) = &result {
            tracing::warn!(%url, error = %e, "API request failed");
        }
        result
    }

    async fn probe_root(&self, base: &str) -> Result<ProbeReply, GatewayError> {
        let started = Instant::now();
        let request = self
            .client
            .get(base)
            .header(ACCEPT, "text/html,application/json")
            .send();

        let response = match tokio::time::timeout(self.probe_timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(normalize_transport(e)),
            Err(_) => return Err(GatewayError::Timeout),
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        let status = response.status().as_u16();
        tracing::debug!(%base, status, latency_ms, "Probe answered");
        Ok(ProbeReply { status, latency_ms })
    }
}

impl Gateway for HttpGateway {
    fn probe<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, ProbeReply> {
        Box::pin(self.probe_root(base))
    }

    fn launch<'a>(
        &'a self,
        base: &'a str,
        request: &'a LaunchRequest,
    ) -> GatewayFuture<'a, LaunchResponse> {
        Box::pin(async move {
            tracing::info!(username = %request.username, list_id = %request.list_id, "Launching task");
            let body = serde_json::to_value(request)
                .map_err(|e| GatewayError::Decode(e.to_string()))?;
            self.call(base, Method::POST, ENDPOINT_RUN, Some(body)).await
        })
    }

    fn list_tasks<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, TaskListResponse> {
        Box::pin(self.call(base, Method::GET, ENDPOINT_TASKS, None))
    }

    fn task_status<'a>(&'a self, base: &'a str, task_id: &'a str) -> GatewayFuture<'a, TaskDetail> {
        Box::pin(async move {
            self.call(base, Method::GET, &status_endpoint(task_id), None).await
        })
    }

    fn task_output<'a>(
        &'a self,
        base: &'a str,
        task_id: &'a str,
    ) -> GatewayFuture<'a, OutputResponse> {
        Box::pin(async move {
            self.call(base, Method::GET, &output_endpoint(task_id), None).await
        })
    }

    fn stop_task<'a>(&'a self, base: &'a str, task_id: &'a str) -> GatewayFuture<'a, Ack> {
        Box::pin(async move {
            self.call(base, Method::POST, &stop_endpoint(task_id), None).await
        })
    }

    fn cleanup<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, CleanupResponse> {
        Box::pin(self.call(base, Method::POST, ENDPOINT_CLEANUP, None))
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), endpoint)
}

fn normalize_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_builder() {
        GatewayError::Network(format!("invalid server address: {err}"))
    } else {
        GatewayError::unreachable()
    }
}

async fn http_error(response: Response) -> GatewayError {
    let status = response.status();
    let fallback = status.canonical_reason().unwrap_or("unknown status").to_string();
    let message = match response.bytes().await {
        Ok(bytes) => error_message_from_body(&bytes).unwrap_or(fallback),
        Err(_) => fallback,
    };
    GatewayError::Http { code: status.as_u16(), message }
}

/// `message` field of a JSON error body, if the body is JSON and has one.
fn error_message_from_body(bytes: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_tolerates_trailing_slash() {
        assert_eq!(join_url("http://h:5000/", "/api/tasks"), "http://h:5000/api/tasks");
        assert_eq!(join_url("http://h:5000", "/api/tasks"), "http://h:5000/api/tasks");
    }

    #[test]
    fn error_body_message_extraction() {
        assert_eq!(
            error_message_from_body(br#"{"status":"error","message":"task id not found"}"#),
            Some("task id not found".to_string())
        );
        assert_eq!(error_message_from_body(br#"{"status":"error"}"#), None);
        assert_eq!(error_message_from_body(b"<html>oops</html>"), None);
    }
}

//! http_request: make an outbound HTTP call and return status and body.

use async_trait::async_trait;
use modai_core::error::ToolError;
use modai_core::tool::{Arguments, Tool, ToolResult};
use reqwest::Method;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::required_str;

/// Bodies longer than this are cut before being handed back to the model.
const MAX_BODY_CHARS: usize = 16_000;

pub struct HttpRequestTool {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRequestTool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn run(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let url = required_str(arguments, "url")?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        let method = match arguments
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase()
            .as_str()
        {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "Invalid HTTP method: {other}. Must be GET, POST, PUT, PATCH, or DELETE."
                )));
            }
        };

        let mut request = self
            .client
            .request(method.clone(), url)
            .timeout(self.timeout);

        if let Some(headers) = arguments.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }

        match arguments.get("body") {
            Some(Value::String(body)) => request = request.body(body.clone()),
            Some(Value::Null) | None => {}
            Some(other) => request = request.json(other),
        }

        debug!(method = %method, url = %url, "Sending HTTP request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Timeout {
                    tool_name: "http_request".into(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                ToolError::ExecutionFailed {
                    tool_name: "http_request".into(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "http_request".into(),
                reason: format!("Failed to read response body: {e}"),
            })?;
        let body: String = body.chars().take(MAX_BODY_CHARS).collect();

        if status.is_client_error() || status.is_server_error() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "http_request".into(),
                reason: format!("HTTP {}: {body}", status.as_u16()),
            });
        }

        Ok(json!({ "status": status.as_u16(), "body": body }))
    }
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request (GET, POST, PUT, PATCH, DELETE). Optional 'headers' object and 'body'. \
         Returns the status code and response body."
    }

    fn example(&self) -> Value {
        json!({ "url": "https://api.github.com/repos/rust-lang/rust", "method": "GET" })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<ToolResult, ToolError> {
        Ok(self.run(arguments).await.into())
    }
}

//! HTTP request tool: call an http(s) URL and return status plus body.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::tool::{Tool, ToolContext, truncate_chars};
use std::collections::HashMap;
use std::time::Duration;

const TRUNCATION_NOTICE: &str = "\n[TRUNCATED]";

pub struct HttpRequestTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl HttpRequestTool {
    pub fn new(timeout: Duration, max_chars: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, max_chars }
    }
}

fn parse_method(method: &str) -> Result<reqwest::Method, ToolError> {
    match method.to_uppercase().as_str() {
        "GET" => Ok(reqwest::Method::GET),
        "POST" => Ok(reqwest::Method::POST),
        "PUT" => Ok(reqwest::Method::PUT),
        "PATCH" => Ok(reqwest::Method::PATCH),
        "DELETE" => Ok(reqwest::Method::DELETE),
        other => Err(ToolError::InvalidArguments(format!(
            "Invalid HTTP method: {other}. Must be GET, POST, PUT, PATCH, or DELETE."
        ))),
    }
}

/// `Status: N` header line, a blank line, then the (possibly truncated) body.
pub fn render_response(status: u16, body: &str, max_chars: usize) -> String {
    let shown = truncate_chars(body, max_chars);
    let notice = if shown.len() < body.len() { TRUNCATION_NOTICE } else { "" };
    format!("Status: {status}\n\n{shown}{notice}")
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request to a URL. Supports GET, POST, PUT, PATCH, and DELETE. \
         Returns the status code and response body."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to send the request to"
                },
                "method": {
                    "type": "string",
                    "description": "GET, POST, PUT, PATCH or DELETE. Defaults to GET."
                },
                "headers": {
                    "type": "object",
                    "description": "Optional HTTP headers as key-value pairs"
                },
                "body": {
                    "description": "Optional request body: a JSON value or a raw string"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<String, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;
        let method = parse_method(arguments["method"].as_str().unwrap_or("GET"))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        let headers: HashMap<String, String> = arguments
            .get("headers")
            .and_then(|h| serde_json::from_value(h.clone()).ok())
            .unwrap_or_default();

        let mut request = self.client.request(method, url);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        request = match arguments.get("body") {
            Some(serde_json::Value::String(raw)) => request.body(raw.clone()),
            Some(serde_json::Value::Null) | None => request,
            Some(json) => request.json(json),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::failed("http_request", e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::failed("http_request", e))?;

        Ok(render_response(status, &body, self.max_chars))
    }
}

//! Amazon Bedrock Runtime client.
//!
//! Implements the [`Inference`] boundary over the Converse API
//! (`POST /model/{modelId}/converse`). Responses are non-streaming; the
//! generated text is the concatenation of the output message's text blocks.
//!
//! Failure classification feeds the invoker's retry loop: HTTP 429,
//! `ThrottlingException`, 5xx, and network errors are transient; other
//! client errors (validation, permissions, unknown model) are fatal.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::invoke::{Inference, InferenceError, InferenceRequest};
use crate::sigv4::{self, AwsCredentials, SigningParams};

pub struct BedrockClient {
    creds: AwsCredentials,
    region: String,
    endpoint_url: Option<String>,
    http: reqwest::Client,
}

impl BedrockClient {
    /// Build a client from environment credentials and pipeline config.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::with_credentials(
            AwsCredentials::from_env()?,
            config.region.clone(),
            config.bedrock_endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    /// Build a client with explicit credentials (tests, pre-resolved roles).
    pub fn with_credentials(
        creds: AwsCredentials,
        region: String,
        endpoint_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            creds,
            region,
            endpoint_url,
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
        }
    }

    fn host(&self) -> String {
        match self.endpoint_url.as_deref() {
            Some(endpoint) => sigv4::service_host(Some(endpoint), "bedrock-runtime", &self.region),
            None => format!("bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

/// Concatenate `output.message.content[].text` from a Converse response.
fn response_text(resp: &Value) -> String {
    resp.pointer("/output/message/content")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait]
impl Inference for BedrockClient {
    async fn converse(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let host = self.host();
        let scheme = sigv4::service_scheme(self.endpoint_url.as_deref());
        // Model ids contain ':'; the canonical URI and the request URI must
        // agree on the encoding.
        let path = format!("/model/{}/converse", sigv4::uri_encode(&request.model_id));

        let body = json!({
            "messages": [
                { "role": "user", "content": [ { "text": request.prompt } ] }
            ],
            "system": [ { "text": request.system } ],
            "inferenceConfig": {
                "maxTokens": request.max_tokens,
                "temperature": request.temperature,
            }
        });
        let payload = serde_json::to_vec(&body)
            .map_err(|e| InferenceError::Fatal(format!("failed to encode request: {}", e)))?;

        let params = SigningParams {
            method: "POST",
            host: &host,
            path: &path,
            query: "",
            payload: &payload,
            region: &self.region,
            service: "bedrock",
            extra_headers: &[],
        };
        let headers = sigv4::sign(&params, &self.creds, Utc::now());

        let mut req = self
            .http
            .post(format!("{}://{}{}", scheme, host, path))
            .header("content-type", "application/json")
            .body(payload);
        for (k, v) in &headers {
            req = req.header(k, v);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| InferenceError::Transient(format!("request failed: {}", e)))?;

        let status = resp.status();
        if status.is_success() {
            let body: Value = resp
                .json()
                .await
                .map_err(|e| InferenceError::Fatal(format!("invalid response body: {}", e)))?;
            return Ok(response_text(&body));
        }

        let body_text = resp.text().await.unwrap_or_default();
        let message = format!(
            "Bedrock converse returned HTTP {}: {}",
            status,
            body_text.chars().take(500).collect::<String>()
        );
        if status.as_u16() == 429
            || status.is_server_error()
            || body_text.contains("ThrottlingException")
        {
            Err(InferenceError::Transient(message))
        } else {
            Err(InferenceError::Fatal(message))
        }
    }
}

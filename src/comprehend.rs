//! Amazon Comprehend client.
//!
//! Implements the [`PiiDetection`] boundary over `DetectPiiEntities`.
//! Comprehend reports offsets in Unicode code points; they are translated
//! to byte offsets here so the screener can slice Rust strings directly.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::SummarizeError;
use crate::models::PiiSpan;
use crate::pii::PiiDetection;
use crate::sigv4::{self, AwsCredentials, SigningParams};

pub struct ComprehendClient {
    creds: AwsCredentials,
    region: String,
    endpoint_url: Option<String>,
    http: reqwest::Client,
}

impl ComprehendClient {
    /// Build a client from environment credentials and pipeline config.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::with_credentials(
            AwsCredentials::from_env()?,
            config.region.clone(),
            config.comprehend_endpoint.clone(),
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

    async fn call(&self, operation: &str, body: Value) -> Result<Value, SummarizeError> {
        let host = sigv4::service_host(self.endpoint_url.as_deref(), "comprehend", &self.region);
        let scheme = sigv4::service_scheme(self.endpoint_url.as_deref());
        let payload =
            serde_json::to_vec(&body).map_err(|e| SummarizeError::Screening(e.to_string()))?;
        let target = format!("Comprehend_20171127.{}", operation);

        let extra = vec![("x-amz-target".to_string(), target)];
        let params = SigningParams {
            method: "POST",
            host: &host,
            path: "/",
            query: "",
            payload: &payload,
            region: &self.region,
            service: "comprehend",
            extra_headers: &extra,
        };
        let headers = sigv4::sign(&params, &self.creds, Utc::now());

        let mut req = self
            .http
            .post(format!("{}://{}/", scheme, host))
            .header("content-type", "application/x-amz-json-1.1")
            .body(payload);
        for (k, v) in &headers {
            req = req.header(k, v);
        }

        let resp = req.send().await.map_err(|e| {
            SummarizeError::Screening(format!("Comprehend request failed: {}", e))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(SummarizeError::Screening(format!(
                "Comprehend {} returned HTTP {}: {}",
                operation,
                status,
                body_text.chars().take(500).collect::<String>()
            )));
        }

        resp.json().await.map_err(|e| {
            SummarizeError::Screening(format!("invalid Comprehend response: {}", e))
        })
    }
}

/// Translate a code-point offset into a byte offset.
fn byte_offset(text: &str, char_offset: u64) -> usize {
    text.char_indices()
        .nth(char_offset as usize)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[async_trait]
impl PiiDetection for ComprehendClient {
    async fn detect(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Vec<PiiSpan>, SummarizeError> {
        let resp = self
            .call(
                "DetectPiiEntities",
                json!({ "Text": text, "LanguageCode": language_code }),
            )
            .await?;

        let entities = resp
            .get("Entities")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut spans = Vec::with_capacity(entities.len());
        for entity in &entities {
            let begin = entity.get("BeginOffset").and_then(Value::as_u64);
            let end = entity.get("EndOffset").and_then(Value::as_u64);
            let (Some(begin), Some(end)) = (begin, end) else {
                continue;
            };
            spans.push(PiiSpan {
                start: byte_offset(text, begin),
                end: byte_offset(text, end),
                category: entity
                    .get("Type")
                    .and_then(Value::as_str)
                    .unwrap_or("UNKNOWN")
                    .to_string(),
                confidence: entity
                    .get("Score")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0) as f32,
            });
        }
        spans.sort_by_key(|s| (s.start, s.end));
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_client(endpoint: String) -> ComprehendClient {
        ComprehendClient::with_credentials(
            AwsCredentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            },
            "us-east-1".to_string(),
            Some(endpoint),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn code_point_offsets_map_to_byte_offsets() {
        // 'é' is 2 bytes; code point 5 starts at byte 6.
        let text = "héllo a@b.com";
        assert_eq!(byte_offset(text, 0), 0);
        assert_eq!(byte_offset(text, 2), 3);
        assert_eq!(byte_offset(text, 13), text.len());
        assert_eq!(byte_offset(text, 99), text.len());
    }

    #[tokio::test]
    async fn detect_translates_entity_offsets() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .header("x-amz-target", "Comprehend_20171127.DetectPiiEntities");
            then.status(200).json_body(json!({
                "Entities": [
                    {"BeginOffset": 6, "EndOffset": 13, "Type": "EMAIL", "Score": 0.98}
                ]
            }));
        });

        let client = test_client(server.base_url());
        // Code points 6..13 cover "a@b.com", at bytes 7..14 because of 'é'.
        let text = "héllo a@b.com";
        let spans = client.detect(text, "en").await.unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].start..spans[0].end], "a@b.com");
        assert_eq!(spans[0].category, "EMAIL");
    }

    #[tokio::test]
    async fn detector_failure_fails_closed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(500).body("InternalServerError");
        });

        let client = test_client(server.base_url());
        let err = client.detect("some text", "en").await.unwrap_err();
        assert!(matches!(err, SummarizeError::Screening(_)));
    }
}

//! Amazon Textract client.
//!
//! Implements the [`TextExtraction`] boundary over the Textract JSON 1.1
//! API: `DetectDocumentText` for the synchronous single-page path and
//! `StartDocumentTextDetection` / `GetDocumentTextDetection` for the
//! asynchronous object-store path. Result pagination (`NextToken`) is
//! handled here so the polling loop above sees one terminal answer.

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::SummarizeError;
use crate::extract::{JobPoll, TextExtraction};
use crate::sigv4::{self, AwsCredentials, SigningParams};

pub struct TextractClient {
    creds: AwsCredentials,
    region: String,
    endpoint_url: Option<String>,
    http: reqwest::Client,
}

impl TextractClient {
    /// Build a client from environment credentials and pipeline config.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::with_credentials(
            AwsCredentials::from_env()?,
            config.region.clone(),
            config.textract_endpoint.clone(),
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
        let host = sigv4::service_host(self.endpoint_url.as_deref(), "textract", &self.region);
        let scheme = sigv4::service_scheme(self.endpoint_url.as_deref());
        let payload = serde_json::to_vec(&body)
            .map_err(|e| SummarizeError::ExtractionFailed(e.to_string()))?;
        let target = format!("Textract.{}", operation);

        let extra = vec![("x-amz-target".to_string(), target)];
        let params = SigningParams {
            method: "POST",
            host: &host,
            path: "/",
            query: "",
            payload: &payload,
            region: &self.region,
            service: "textract",
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
            SummarizeError::ExtractionFailed(format!("Textract request failed: {}", e))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(SummarizeError::ExtractionFailed(format!(
                "Textract {} returned HTTP {}: {}",
                operation,
                status,
                body_text.chars().take(500).collect::<String>()
            )));
        }

        resp.json().await.map_err(|e| {
            SummarizeError::ExtractionFailed(format!("invalid Textract response: {}", e))
        })
    }
}

/// Collect `LINE` block text grouped by page, in page then reading order.
fn pages_from_blocks(blocks: &[Value]) -> Vec<String> {
    let mut pages: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    for block in blocks {
        if block.get("BlockType").and_then(Value::as_str) != Some("LINE") {
            continue;
        }
        let Some(text) = block.get("Text").and_then(Value::as_str) else {
            continue;
        };
        let page = block.get("Page").and_then(Value::as_u64).unwrap_or(1);
        pages.entry(page).or_default().push(text);
    }
    pages.into_values().map(|lines| lines.join("\n")).collect()
}

#[async_trait]
impl TextExtraction for TextractClient {
    async fn detect_text(&self, pdf_bytes: &[u8]) -> Result<String, SummarizeError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(pdf_bytes);
        let resp = self
            .call(
                "DetectDocumentText",
                json!({ "Document": { "Bytes": encoded } }),
            )
            .await?;
        let blocks = resp
            .get("Blocks")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(pages_from_blocks(&blocks).join("\n"))
    }

    async fn start_text_detection(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, SummarizeError> {
        let resp = self
            .call(
                "StartDocumentTextDetection",
                json!({
                    "DocumentLocation": {
                        "S3Object": { "Bucket": bucket, "Name": key }
                    }
                }),
            )
            .await?;
        resp.get("JobId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                SummarizeError::ExtractionFailed("Textract response missing JobId".to_string())
            })
    }

    async fn get_text_detection(&self, job_id: &str) -> Result<JobPoll, SummarizeError> {
        let mut resp = self
            .call("GetDocumentTextDetection", json!({ "JobId": job_id }))
            .await?;

        let status = resp
            .get("JobStatus")
            .and_then(Value::as_str)
            .unwrap_or("IN_PROGRESS")
            .to_string();

        match status.as_str() {
            "SUCCEEDED" => {
                let mut blocks: Vec<Value> = resp
                    .get("Blocks")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                // Drain result pages; this does not resubmit the job.
                while let Some(token) = resp.get("NextToken").and_then(Value::as_str) {
                    resp = self
                        .call(
                            "GetDocumentTextDetection",
                            json!({ "JobId": job_id, "NextToken": token }),
                        )
                        .await?;
                    if let Some(more) = resp.get("Blocks").and_then(Value::as_array) {
                        blocks.extend(more.iter().cloned());
                    }
                }
                Ok(JobPoll::Succeeded {
                    pages: pages_from_blocks(&blocks),
                })
            }
            "FAILED" => Ok(JobPoll::Failed {
                reason: resp
                    .get("StatusMessage")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            }),
            _ => Ok(JobPoll::InProgress),
        }
    }
}

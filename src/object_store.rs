//! Object storage boundary.
//!
//! The source resolver fetches text and DOCX objects eagerly through
//! [`ObjectStore::get`]; object-store PDFs are instead handed to the
//! asynchronous extraction job by reference and never downloaded locally.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::config::PipelineConfig;
use crate::error::SummarizeError;
use crate::sigv4::{self, AwsCredentials, SigningParams};

/// Read-only object store access.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, SummarizeError>;
}

/// S3 client using the REST API with SigV4 signing.
///
/// Supports custom endpoints for S3-compatible services (MinIO, LocalStack)
/// and test servers via `s3_endpoint` in the configuration.
pub struct S3Client {
    creds: AwsCredentials,
    region: String,
    endpoint_url: Option<String>,
    http: reqwest::Client,
}

impl S3Client {
    /// Build a client from environment credentials and pipeline config.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::with_credentials(
            AwsCredentials::from_env()?,
            config.region.clone(),
            config.s3_endpoint.clone(),
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

    fn host(&self, bucket: &str) -> String {
        match self.endpoint_url.as_deref() {
            Some(endpoint) => sigv4::service_host(Some(endpoint), "s3", &self.region),
            None => format!("{}.s3.{}.amazonaws.com", bucket, self.region),
        }
    }

    /// Path prefix: virtual-hosted style on AWS, path style on overrides.
    fn object_path(&self, bucket: &str, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(sigv4::uri_encode)
            .collect::<Vec<_>>()
            .join("/");
        if self.endpoint_url.is_some() {
            format!("/{}/{}", sigv4::uri_encode(bucket), encoded_key)
        } else {
            format!("/{}", encoded_key)
        }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, SummarizeError> {
        let host = self.host(bucket);
        let path = self.object_path(bucket, key);
        let scheme = sigv4::service_scheme(self.endpoint_url.as_deref());
        let url = format!("{}://{}{}", scheme, host, path);

        let params = SigningParams {
            method: "GET",
            host: &host,
            path: &path,
            query: "",
            payload: b"",
            region: &self.region,
            service: "s3",
            extra_headers: &[],
        };
        let headers = sigv4::sign(&params, &self.creds, Utc::now());

        let mut req = self.http.get(&url);
        for (k, v) in &headers {
            req = req.header(k, v);
        }

        let resp = req.send().await.map_err(|e| {
            SummarizeError::Source(format!("failed to get s3://{}/{}: {}", bucket, key, e))
        })?;

        if !resp.status().is_success() {
            return Err(SummarizeError::Source(format!(
                "S3 GetObject failed (HTTP {}) for s3://{}/{}",
                resp.status(),
                bucket,
                key
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SummarizeError::Source(format!("failed to read object body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

//! AWS Signature Version 4 request signing.
//!
//! All four service clients (extraction, PII detection, inference, object
//! store) sign their requests here. Signing is pure Rust (`hmac`, `sha2`)
//! with no C library dependencies, so the crate builds on musl targets.
//!
//! Credentials are read from the environment:
//! - `AWS_ACCESS_KEY_ID` (required)
//! - `AWS_SECRET_ACCESS_KEY` (required)
//! - `AWS_SESSION_TOKEN` (optional, for temporary credentials)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// AWS credentials loaded from environment variables.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and optionally `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// Everything needed to sign one request.
pub struct SigningParams<'a> {
    /// HTTP method (`GET`, `POST`).
    pub method: &'a str,
    /// Target host, without scheme.
    pub host: &'a str,
    /// URI path with each segment already RFC 3986 encoded.
    pub path: &'a str,
    /// Canonical (sorted, encoded) query string; empty for none.
    pub query: &'a str,
    /// Request body.
    pub payload: &'a [u8],
    /// Signing region.
    pub region: &'a str,
    /// SigV4 service name (`s3`, `textract`, `comprehend`, `bedrock`).
    pub service: &'a str,
    /// Additional `x-amz-*` headers (e.g. `x-amz-target`); these must be
    /// part of the signed header set.
    pub extra_headers: &'a [(String, String)],
}

/// Sign a request, returning the headers to attach.
///
/// Includes `authorization`, `x-amz-date`, `x-amz-content-sha256`, any
/// extra headers, and `x-amz-security-token` when a session token is set.
/// The `host` header is covered by the signature but left to the HTTP
/// client to emit.
pub fn sign(params: &SigningParams<'_>, creds: &AwsCredentials, now: DateTime<Utc>) -> Vec<(String, String)> {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let payload_hash = hex_sha256(params.payload);

    let mut headers = vec![
        ("host".to_string(), params.host.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    for (k, v) in params.extra_headers {
        headers.push((k.to_ascii_lowercase(), v.clone()));
    }
    if let Some(ref token) = creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        params.method, params.path, params.query, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!(
        "{}/{}/{}/aws4_request",
        date_stamp, params.region, params.service
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        &creds.secret_access_key,
        &date_stamp,
        params.region,
        params.service,
    );
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key_id, credential_scope, signed_headers, signature
    );

    let mut out = vec![
        ("authorization".to_string(), authorization),
        ("x-amz-content-sha256".to_string(), payload_hash),
        ("x-amz-date".to_string(), amz_date),
    ];
    for (k, v) in params.extra_headers {
        out.push((k.to_ascii_lowercase(), v.clone()));
    }
    if let Some(ref token) = creds.session_token {
        out.push(("x-amz-security-token".to_string(), token.clone()));
    }
    out
}

/// Compute the hex-encoded SHA-256 hash of data.
pub fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute hex-encoded HMAC-SHA256.
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in canonical requests).
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
pub fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Strip a configured endpoint override down to a host, or fall back to the
/// standard `<service>.<region>.amazonaws.com` form.
pub fn service_host(endpoint_url: Option<&str>, service: &str, region: &str) -> String {
    match endpoint_url {
        Some(endpoint) => endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string(),
        None => format!("{}.{}.amazonaws.com", service, region),
    }
}

/// Scheme to pair with [`service_host`]: endpoint overrides keep their
/// declared scheme (test servers are plain HTTP), AWS hosts are HTTPS.
pub fn service_scheme(endpoint_url: Option<&str>) -> &'static str {
    match endpoint_url {
        Some(endpoint) if endpoint.starts_with("http://") => "http",
        _ => "https",
    }
}

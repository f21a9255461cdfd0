//! Pipeline configuration.
//!
//! [`PipelineConfig`] enumerates every recognized option with its default.
//! A config is immutable for the duration of one pipeline run and validated
//! once at pipeline entry; callers may supply a fresh config per call.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::SummarizeError;

/// How detected PII is handled before text reaches the inference endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiMode {
    /// Replace detected spans with the configured mask (default).
    Redact,
    /// Refuse to summarize when PII is detected.
    Block,
    /// Skip screening entirely.
    Off,
}

impl Default for PiiMode {
    fn default() -> Self {
        PiiMode::Redact
    }
}

impl PiiMode {
    /// Lowercase name as used in config files and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiMode::Redact => "redact",
            PiiMode::Block => "block",
            PiiMode::Off => "off",
        }
    }
}

impl FromStr for PiiMode {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redact" => Ok(PiiMode::Redact),
            "block" => Ok(PiiMode::Block),
            "off" => Ok(PiiMode::Off),
            other => Err(SummarizeError::InvalidConfig(format!(
                "unknown pii mode '{}' (expected redact, block, or off)",
                other
            ))),
        }
    }
}

/// Configuration carried end-to-end through one pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Inference model identifier.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// AWS region for all service endpoints.
    #[serde(default = "default_region")]
    pub region: String,
    /// Override for the text-extraction endpoint (tests, LocalStack).
    #[serde(default)]
    pub textract_endpoint: Option<String>,
    /// Override for the PII-detection endpoint.
    #[serde(default)]
    pub comprehend_endpoint: Option<String>,
    /// Override for the inference endpoint.
    #[serde(default)]
    pub bedrock_endpoint: Option<String>,
    /// Override for the object-store endpoint.
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    /// Maximum tokens in the generated summary.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// PII handling mode.
    #[serde(default)]
    pub pii_mode: PiiMode,
    /// Mask literal substituted for redacted spans. Must not itself look
    /// like a PII pattern, so that re-screening redacted text is a no-op.
    #[serde(default = "default_pii_mask")]
    pub pii_mask: String,
    /// Language code passed to the PII detector.
    #[serde(default = "default_pii_language_code")]
    pub pii_language_code: String,
    /// Chunk budget for PII screening. The detector enforces a 5 KB
    /// per-request limit; the default leaves headroom under it.
    #[serde(default = "default_pii_chunk_bytes")]
    pub pii_chunk_bytes: usize,
    /// Input budget per inference call; longer documents are summarized
    /// per chunk and then combined.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    /// Retry budget for transient inference failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Seconds between extraction-job polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Total wait budget for an extraction job, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            region: default_region(),
            textract_endpoint: None,
            comprehend_endpoint: None,
            bedrock_endpoint: None,
            s3_endpoint: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            pii_mode: PiiMode::default(),
            pii_mask: default_pii_mask(),
            pii_language_code: default_pii_language_code(),
            pii_chunk_bytes: default_pii_chunk_bytes(),
            max_input_bytes: default_max_input_bytes(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

fn default_model_id() -> String {
    "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string()
}
fn default_region() -> String {
    std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string())
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.3
}
fn default_pii_mask() -> String {
    "[REDACTED]".to_string()
}
fn default_pii_language_code() -> String {
    "en".to_string()
}
fn default_pii_chunk_bytes() -> usize {
    4096
}
fn default_max_input_bytes() -> usize {
    150_000
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_poll_timeout_secs() -> u64 {
    300
}

impl PipelineConfig {
    /// Validate once at pipeline entry.
    pub fn validate(&self) -> Result<(), SummarizeError> {
        if self.model_id.trim().is_empty() {
            return Err(SummarizeError::InvalidConfig(
                "model_id must not be empty".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(SummarizeError::InvalidConfig(
                "region must not be empty".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max_tokens must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(SummarizeError::InvalidConfig(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if self.pii_mask.is_empty() {
            return Err(SummarizeError::InvalidConfig(
                "pii_mask must not be empty".to_string(),
            ));
        }
        if self.pii_chunk_bytes == 0 {
            return Err(SummarizeError::InvalidConfig(
                "pii_chunk_bytes must be at least 1".to_string(),
            ));
        }
        if self.max_input_bytes == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max_input_bytes must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(SummarizeError::InvalidConfig(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval between extraction-job polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Total extraction-job wait budget.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

/// Load a [`PipelineConfig`] from a TOML file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: PipelineConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn default_pii_mode_is_redact() {
        assert_eq!(PipelineConfig::default().pii_mode, PiiMode::Redact);
    }

    #[test]
    fn rejects_empty_mask() {
        let config = PipelineConfig {
            pii_mask: String::new(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SummarizeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let config = PipelineConfig {
            temperature: 1.5,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_chunk_budget() {
        let config = PipelineConfig {
            pii_chunk_bytes: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn pii_mode_parses_known_names() {
        assert_eq!(PiiMode::from_str("redact").unwrap(), PiiMode::Redact);
        assert_eq!(PiiMode::from_str("block").unwrap(), PiiMode::Block);
        assert_eq!(PiiMode::from_str("off").unwrap(), PiiMode::Off);
        assert!(PiiMode::from_str("mask").is_err());
    }

    #[test]
    fn toml_overrides_defaults() {
        let parsed: PipelineConfig = toml::from_str(
            r#"
model_id = "anthropic.claude-3-haiku-20240307-v1:0"
pii_mode = "block"
max_tokens = 256
"#,
        )
        .unwrap();
        assert_eq!(parsed.model_id, "anthropic.claude-3-haiku-20240307-v1:0");
        assert_eq!(parsed.pii_mode, PiiMode::Block);
        assert_eq!(parsed.max_tokens, 256);
        // Untouched fields keep their defaults.
        assert_eq!(parsed.pii_mask, "[REDACTED]");
        assert_eq!(parsed.poll_timeout_secs, 300);
    }
}

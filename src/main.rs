//! # Doc Summarizer CLI (`summarize`)
//!
//! Summarize a document from a local path, an S3 URI, or stdin.
//!
//! ```bash
//! # Summarize a local file
//! summarize document.txt
//!
//! # Summarize a document in S3
//! summarize s3://my-bucket/path/to/doc.pdf
//!
//! # Summarize stdin
//! cat document.txt | summarize -
//!
//! # Refuse documents containing PII
//! summarize report.docx --pii block
//! ```
//!
//! Credentials come from the standard `AWS_*` environment variables (or the
//! task/instance role when run inside a VPC with private endpoints).

use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use doc_summarizer::config::{load_config, PiiMode, PipelineConfig};
use doc_summarizer::models::DocumentReference;
use doc_summarizer::pipeline::Pipeline;
use doc_summarizer::source::reference_from_str;

/// Summarize a document using a hosted model endpoint, with optional PII
/// screening and redaction.
#[derive(Parser)]
#[command(
    name = "summarize",
    about = "Summarize text, PDF, and Word documents with PII screening",
    version
)]
struct Cli {
    /// File path, S3 URI (s3://bucket/key), or '-' for stdin.
    source: String,

    /// Model identifier (default: anthropic.claude-3-5-sonnet-20241022-v2:0).
    #[arg(long)]
    model: Option<String>,

    /// AWS region (default: AWS_REGION or us-east-1).
    #[arg(long)]
    region: Option<String>,

    /// Maximum tokens in the summary.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// PII handling: redact (mask before the model, the default), block
    /// (refuse if PII is found), or off.
    #[arg(long)]
    pii: Option<String>,

    /// Write the summary to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional TOML configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Layer CLI flags over the file (or default) configuration. Absent flags
/// leave the underlying value untouched.
fn apply_overrides(mut config: PipelineConfig, cli: &Cli) -> Result<PipelineConfig> {
    if let Some(model) = &cli.model {
        config.model_id = model.clone();
    }
    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(pii) = &cli.pii {
        config.pii_mode = PiiMode::from_str(pii)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    let config = apply_overrides(base, &cli)?;

    let pipeline = Pipeline::aws(&config)?;

    let result = if cli.source == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        pipeline
            .summarize_document(DocumentReference::Bytes(buf), &config)
            .await?
    } else {
        let reference = reference_from_str(&cli.source)?;
        pipeline.summarize_document(reference, &config).await?
    };

    match cli.output {
        Some(path) => {
            std::fs::write(&path, &result.summary_text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Summary written to {}", path.display());
        }
        None => println!("{}", result.summary_text),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let file_config = PipelineConfig {
            pii_mode: PiiMode::Block,
            model_id: "file-model".to_string(),
            ..PipelineConfig::default()
        };
        let cli = parse(&["summarize", "doc.txt"]);
        let config = apply_overrides(file_config, &cli).unwrap();
        assert_eq!(config.pii_mode, PiiMode::Block);
        assert_eq!(config.model_id, "file-model");
    }

    #[test]
    fn flags_override_file_values() {
        let file_config = PipelineConfig {
            pii_mode: PiiMode::Block,
            ..PipelineConfig::default()
        };
        let cli = parse(&[
            "summarize",
            "doc.txt",
            "--pii",
            "off",
            "--model",
            "cli-model",
            "--max-tokens",
            "256",
        ]);
        let config = apply_overrides(file_config, &cli).unwrap();
        assert_eq!(config.pii_mode, PiiMode::Off);
        assert_eq!(config.model_id, "cli-model");
        assert_eq!(config.max_tokens, 256);
    }

    #[test]
    fn default_pii_mode_is_redact() {
        let cli = parse(&["summarize", "doc.txt"]);
        let config = apply_overrides(PipelineConfig::default(), &cli).unwrap();
        assert_eq!(config.pii_mode, PiiMode::Redact);
    }

    #[test]
    fn invalid_pii_value_is_rejected() {
        let cli = parse(&["summarize", "doc.txt", "--pii", "sometimes"]);
        assert!(apply_overrides(PipelineConfig::default(), &cli).is_err());
    }
}

//! Error taxonomy for the summarization pipeline.
//!
//! Every pipeline stage either returns a fully valid output or one of these
//! variants; no stage produces a partially valid result. All errors are
//! terminal for the current invocation; a failed run is restarted from the
//! pipeline entry point, never resumed mid-stage.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors surfaced by the summarization pipeline.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// The input format cannot be processed (e.g. binary `.doc`).
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The input claimed to be text but is not valid UTF-8.
    ///
    /// Invalid byte sequences are never silently replaced or dropped.
    #[error("text decoding failed: {0}")]
    Decode(String),

    /// Reading the underlying source (local file or object store) failed,
    /// or the source reference itself is malformed.
    #[error("failed to read source: {0}")]
    Source(String),

    /// The extraction service rejected or failed the document.
    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),

    /// An asynchronous extraction job did not reach a terminal state
    /// within the configured polling deadline.
    #[error("extraction job {job_id} did not complete within {waited_secs}s")]
    ExtractionTimeout {
        /// Provider-assigned job identifier.
        job_id: String,
        /// Total wait budget that elapsed.
        waited_secs: u64,
    },

    /// The PII detection service could not screen the document.
    ///
    /// Screening fails closed: text is never forwarded to the inference
    /// endpoint unscreened.
    #[error("PII screening failed: {0}")]
    Screening(String),

    /// `pii_mode = "block"` and the document contains detected PII.
    ///
    /// Carries per-category span counts for audit. No partial redaction
    /// occurs and the inference endpoint is never called.
    #[error("document contains PII; summarization blocked ({})", format_counts(.counts))]
    PiiDetected {
        /// Number of merged PII spans per detected category.
        counts: BTreeMap<String, usize>,
    },

    /// The inference endpoint failed non-transiently, or transient failures
    /// exhausted the retry budget.
    #[error("model invocation failed: {0}")]
    Invocation(String),

    /// The supplied configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    if counts.is_empty() {
        return "no categories".to_string();
    }
    counts
        .iter()
        .map(|(category, n)| format!("{}: {}", category, n))
        .collect::<Vec<_>>()
        .join(", ")
}

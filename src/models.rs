//! Core data types shared across the pipeline stages.

use std::path::PathBuf;
use std::time::Instant;

/// A reference to the document to be summarized.
///
/// Closed variant type consumed exactly once by the source resolver;
/// every variant is handled exhaustively there.
#[derive(Debug, Clone)]
pub enum DocumentReference {
    /// Local filesystem path; format detected from the extension.
    Path(PathBuf),
    /// Object-store reference (`s3://bucket/key`).
    ObjectUri {
        /// Bucket name.
        bucket: String,
        /// Object key within the bucket.
        key: String,
    },
    /// Raw bytes with no name (e.g. stdin); treated as UTF-8 text.
    Bytes(Vec<u8>),
    /// Inline text supplied directly by the caller.
    Text(String),
}

/// Detected document format, driving the extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Plain UTF-8 text (also `.md`, `.json`, `.html`, `.csv`, `.yaml`).
    Text,
    /// PDF, extracted through the hosted text-detection service.
    Pdf,
    /// OOXML word-processor document.
    Docx,
}

impl DocumentFormat {
    /// Human-readable name used in log events.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Text => "text",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// The extracted plain text of a document.
///
/// Never mutated after creation; redaction produces a new string rather
/// than rewriting this one.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Full extracted text.
    pub text: String,
    /// Format the text was extracted from.
    pub format: DocumentFormat,
    /// Size in bytes of the resolved source payload. For object-store PDFs
    /// extracted remotely the raw payload is never fetched locally, so this
    /// records the extracted text length instead.
    pub source_size: u64,
}

/// State of an asynchronous extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    InProgress,
    Succeeded,
    Failed,
}

/// Transient handle for one asynchronous PDF extraction job.
///
/// Created on submission, polled until a terminal state, and discarded once
/// the text is assembled or the job is declared failed. Dropping the handle
/// does not cancel the remote job.
#[derive(Debug)]
pub struct ExtractionJob {
    /// Provider-assigned job identifier.
    pub job_id: String,
    /// Last observed job state.
    pub state: JobState,
    /// Pages retrieved once the job succeeds.
    pub pages_retrieved: usize,
    /// Submission time, used for the polling deadline.
    pub started_at: Instant,
}

impl ExtractionJob {
    /// Record a freshly submitted job.
    pub fn new(job_id: String, started_at: Instant) -> Self {
        Self {
            job_id,
            state: JobState::Submitted,
            pages_retrieved: 0,
            started_at,
        }
    }
}

/// One bounded-size segment of a larger text.
///
/// Chunks never overlap, appear in order, and concatenate back to the
/// original text exactly. `offset` indexes into the parent text so that
/// per-chunk detection results can be reconciled against the full document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Byte offset of this chunk within the parent text.
    pub offset: usize,
    /// Chunk text.
    pub text: String,
}

/// One detected PII span.
///
/// Offsets are byte indices, relative to a single chunk as returned by the
/// detector, or to the full text after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct PiiSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Detector-assigned category (e.g. `EMAIL`, `SSN`).
    pub category: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

/// The sole success output of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    /// Generated summary text.
    pub summary_text: String,
}

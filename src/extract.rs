//! Per-format text extraction.
//!
//! Plain text is decoded strictly as UTF-8. DOCX containers are parsed
//! locally (zip + `word/document.xml`), concatenating paragraph text in
//! document order with paragraph breaks as newlines. PDFs go through the
//! hosted text-detection service: a single blocking call for local bytes,
//! or an asynchronous job polled to a terminal state for object-store
//! documents.
//!
//! Extraction never partially succeeds: either the full document's text is
//! returned or an error is raised.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::SummarizeError;
use crate::models::{DocumentFormat, ExtractedDocument, ExtractionJob, JobState};

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// One poll of an asynchronous extraction job.
#[derive(Debug)]
pub enum JobPoll {
    /// Job not yet terminal.
    InProgress,
    /// Job finished; page texts in page order.
    Succeeded { pages: Vec<String> },
    /// Job failed with a provider-supplied reason.
    Failed { reason: String },
}

/// Text extraction service boundary.
///
/// Implemented by the real Textract client and by test doubles.
#[async_trait]
pub trait TextExtraction: Send + Sync {
    /// Synchronous extraction of a single-page PDF supplied as bytes.
    async fn detect_text(&self, pdf_bytes: &[u8]) -> Result<String, SummarizeError>;

    /// Submit an asynchronous job for an object-store PDF; returns the job id.
    async fn start_text_detection(&self, bucket: &str, key: &str)
        -> Result<String, SummarizeError>;

    /// Poll a previously submitted job. Idempotent; never resubmits.
    async fn get_text_detection(&self, job_id: &str) -> Result<JobPoll, SummarizeError>;
}

/// Extract plain text from locally resolved bytes.
pub async fn extract(
    bytes: &[u8],
    format: DocumentFormat,
    extraction: &dyn TextExtraction,
) -> Result<ExtractedDocument, SummarizeError> {
    let text = match format {
        DocumentFormat::Text => decode_utf8(bytes)?,
        DocumentFormat::Docx => extract_docx(bytes)?,
        // Sync path; only valid for single-page PDFs.
        DocumentFormat::Pdf => extraction.detect_text(bytes).await?,
    };
    debug!(format = format.as_str(), source_bytes = bytes.len(), text_bytes = text.len(), "extracted document");
    Ok(ExtractedDocument {
        text,
        format,
        source_size: bytes.len() as u64,
    })
}

/// Extract an object-store PDF through the asynchronous job state machine.
///
/// Submits one job and polls it on `poll_interval` until it reaches a
/// terminal state or `poll_timeout` elapses. Polling blocks the calling
/// invocation cooperatively (sleeps go through the injected [`Clock`]).
/// On timeout the job handle is dropped; the remote job is not cancelled.
pub async fn extract_remote_pdf(
    extraction: &dyn TextExtraction,
    clock: &dyn Clock,
    bucket: &str,
    key: &str,
    poll_interval: Duration,
    poll_timeout: Duration,
) -> Result<ExtractedDocument, SummarizeError> {
    let job_id = extraction.start_text_detection(bucket, key).await?;
    let mut job = ExtractionJob::new(job_id, clock.now());
    debug!(job_id = %job.job_id, bucket, key, "submitted extraction job");

    let deadline = job.started_at + poll_timeout;
    loop {
        if clock.now() >= deadline {
            return Err(SummarizeError::ExtractionTimeout {
                job_id: job.job_id,
                waited_secs: poll_timeout.as_secs(),
            });
        }

        match extraction.get_text_detection(&job.job_id).await? {
            JobPoll::Succeeded { pages } => {
                job.state = JobState::Succeeded;
                job.pages_retrieved = pages.len();
                info!(job_id = %job.job_id, pages = job.pages_retrieved, "extraction job succeeded");
                let text = pages.join("\n");
                let source_size = text.len() as u64;
                return Ok(ExtractedDocument {
                    text,
                    format: DocumentFormat::Pdf,
                    source_size,
                });
            }
            JobPoll::Failed { reason } => {
                job.state = JobState::Failed;
                return Err(SummarizeError::ExtractionFailed(format!(
                    "job {} failed: {}",
                    job.job_id, reason
                )));
            }
            JobPoll::InProgress => {
                job.state = JobState::InProgress;
                debug!(job_id = %job.job_id, "extraction job in progress");
            }
        }

        clock.sleep(poll_interval).await;
    }
}

/// Strict UTF-8 decode; invalid sequences are an error, never replaced.
fn decode_utf8(bytes: &[u8]) -> Result<String, SummarizeError> {
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|e| SummarizeError::Decode(e.to_string()))
}

/// Extract paragraph text from a DOCX container.
///
/// Reads `word/document.xml` and concatenates `w:t` runs per paragraph;
/// paragraphs become newline-separated lines, empty paragraphs are skipped.
/// Embedded images and tables outside paragraph text are ignored.
fn extract_docx(bytes: &[u8]) -> Result<String, SummarizeError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| SummarizeError::ExtractionFailed(format!("not a docx container: {}", e)))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive.by_name("word/document.xml").map_err(|_| {
            SummarizeError::ExtractionFailed("word/document.xml not found".to_string())
        })?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| SummarizeError::ExtractionFailed(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(SummarizeError::ExtractionFailed(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    extract_paragraphs(&doc_xml)
}

fn extract_paragraphs(xml: &[u8]) -> Result<String, SummarizeError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text_run = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_text_run => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(SummarizeError::ExtractionFailed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

//! Source resolver.
//!
//! Normalizes a [`DocumentReference`] into raw bytes plus a detected format,
//! or a remote handle when the bytes should stay in the object store (PDFs
//! headed for the asynchronous extraction job).

use std::path::Path;

use tracing::debug;

use crate::error::SummarizeError;
use crate::models::{DocumentFormat, DocumentReference};
use crate::object_store::ObjectStore;

/// Extensions read as plain UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "json", "html", "htm", "csv", "yaml", "yml"];

/// A resolved source, ready for extraction.
#[derive(Debug)]
pub enum ResolvedSource {
    /// Local bytes with a known format.
    Bytes {
        bytes: Vec<u8>,
        format: DocumentFormat,
    },
    /// An object-store PDF, extracted remotely without a local download.
    RemotePdf { bucket: String, key: String },
}

/// Parse a CLI/source string into a [`DocumentReference`].
///
/// `s3://bucket/key` becomes an object reference; anything else is a local
/// path. Malformed S3 URIs are rejected.
pub fn reference_from_str(source: &str) -> Result<DocumentReference, SummarizeError> {
    let source = source.trim();
    if let Some(rest) = source
        .strip_prefix("s3://")
        .or_else(|| source.strip_prefix("S3://"))
    {
        let (bucket, key) = rest
            .split_once('/')
            .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
            .ok_or_else(|| {
                SummarizeError::Source(format!(
                    "invalid S3 URI '{}' (expected s3://bucket/key)",
                    source
                ))
            })?;
        return Ok(DocumentReference::ObjectUri {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
    }
    Ok(DocumentReference::Path(source.into()))
}

/// Resolve a reference into bytes plus format, or a remote PDF handle.
///
/// Object-store text and DOCX objects are fetched eagerly; object-store
/// PDFs stay remote for the asynchronous extraction job. The only side
/// effect is a read of the underlying storage.
pub async fn resolve(
    reference: DocumentReference,
    store: &dyn ObjectStore,
) -> Result<ResolvedSource, SummarizeError> {
    match reference {
        DocumentReference::Path(path) => {
            let format = detect_format(&path)?;
            let bytes = std::fs::read(&path).map_err(|e| {
                SummarizeError::Source(format!("failed to read {}: {}", path.display(), e))
            })?;
            debug!(path = %path.display(), format = format.as_str(), bytes = bytes.len(), "resolved local file");
            Ok(ResolvedSource::Bytes { bytes, format })
        }
        DocumentReference::ObjectUri { bucket, key } => {
            let format = detect_format(Path::new(&key))?;
            if format == DocumentFormat::Pdf {
                debug!(bucket, key, "resolved object-store pdf for remote extraction");
                return Ok(ResolvedSource::RemotePdf { bucket, key });
            }
            let bytes = store.get(&bucket, &key).await?;
            debug!(bucket, key, format = format.as_str(), bytes = bytes.len(), "fetched object");
            Ok(ResolvedSource::Bytes { bytes, format })
        }
        // No name to inspect; treated as plain UTF-8 text.
        DocumentReference::Bytes(bytes) => Ok(ResolvedSource::Bytes {
            bytes,
            format: DocumentFormat::Text,
        }),
        DocumentReference::Text(text) => Ok(ResolvedSource::Bytes {
            bytes: text.into_bytes(),
            format: DocumentFormat::Text,
        }),
    }
}

/// Detect the document format from a file extension.
///
/// Unknown or missing extensions fall back to plain text; legacy binary
/// `.doc` is rejected outright.
fn detect_format(path: &Path) -> Result<DocumentFormat, SummarizeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => Ok(DocumentFormat::Pdf),
        Some("docx") => Ok(DocumentFormat::Docx),
        Some("doc") => Err(SummarizeError::UnsupportedFormat(
            "binary .doc is not supported; convert to .docx or PDF".to_string(),
        )),
        Some(other) if TEXT_EXTENSIONS.contains(&other) => Ok(DocumentFormat::Text),
        _ => Ok(DocumentFormat::Text),
    }
}

//! PII screening and redaction.
//!
//! Detection runs per chunk (the detection service enforces a ~5 KB
//! per-request limit), spans are shifted into full-text offsets and merged,
//! then the configured policy is applied: mask the spans, refuse the
//! document, or skip screening entirely.
//!
//! Screening fails closed: if the detector cannot be reached, the text is
//! never forwarded to the inference endpoint unscreened.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::chunk::chunk_text;
use crate::config::{PiiMode, PipelineConfig};
use crate::error::SummarizeError;
use crate::models::PiiSpan;

/// PII detection service boundary.
///
/// Returns spans with byte offsets relative to the supplied chunk, in order.
#[async_trait]
pub trait PiiDetection: Send + Sync {
    async fn detect(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Vec<PiiSpan>, SummarizeError>;
}

/// Screen `text` according to the configured PII mode.
///
/// Returns the final text plus whether any PII was detected. In `redact`
/// mode the returned text has every merged span replaced by the mask; in
/// `block` mode a non-empty merged set aborts with
/// [`SummarizeError::PiiDetected`] carrying per-category counts; `off`
/// makes no detector calls at all.
pub async fn screen(
    text: &str,
    config: &PipelineConfig,
    detector: &dyn PiiDetection,
) -> Result<(String, bool), SummarizeError> {
    if config.pii_mode == PiiMode::Off {
        return Ok((text.to_string(), false));
    }
    if text.trim().is_empty() {
        return Ok((text.to_string(), false));
    }

    let spans = detect_all(text, config, detector).await?;
    let merged = merge_spans(spans);
    debug!(spans = merged.len(), "pii detection complete");

    match config.pii_mode {
        PiiMode::Off => unreachable!("handled above"),
        PiiMode::Block => {
            if merged.is_empty() {
                Ok((text.to_string(), false))
            } else {
                Err(SummarizeError::PiiDetected {
                    counts: category_counts(&merged),
                })
            }
        }
        PiiMode::Redact => {
            let detected = !merged.is_empty();
            if detected {
                info!(spans = merged.len(), "redacting detected pii spans");
            }
            Ok((apply_mask(text, &merged, &config.pii_mask), detected))
        }
    }
}

/// Run chunked detection and translate spans to full-text offsets.
async fn detect_all(
    text: &str,
    config: &PipelineConfig,
    detector: &dyn PiiDetection,
) -> Result<Vec<PiiSpan>, SummarizeError> {
    let mut spans = Vec::new();
    for chunk in chunk_text(text, config.pii_chunk_bytes) {
        if chunk.text.trim().is_empty() {
            continue;
        }
        for span in detector
            .detect(&chunk.text, &config.pii_language_code)
            .await?
        {
            spans.push(PiiSpan {
                start: chunk.offset + span.start,
                end: chunk.offset + span.end,
                category: span.category,
                confidence: span.confidence,
            });
        }
    }
    Ok(spans)
}

/// Merge spans into a non-overlapping, sorted set.
///
/// Overlapping spans are unioned regardless of category (the span with the
/// higher confidence keeps its category); adjacent spans are unioned only
/// when the category matches, which reconciles detections split across a
/// chunk boundary.
fn merge_spans(mut spans: Vec<PiiSpan>) -> Vec<PiiSpan> {
    spans.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
    let mut merged: Vec<PiiSpan> = Vec::with_capacity(spans.len());

    for span in spans {
        match merged.last_mut() {
            Some(last)
                if span.start < last.end
                    || (span.start == last.end && span.category == last.category) =>
            {
                last.end = last.end.max(span.end);
                if span.confidence > last.confidence {
                    last.category = span.category;
                    last.confidence = span.confidence;
                }
            }
            _ => merged.push(span),
        }
    }
    merged
}

/// Count merged spans per category, for the block-mode audit payload.
fn category_counts(spans: &[PiiSpan]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for span in spans {
        *counts.entry(span.category.clone()).or_insert(0) += 1;
    }
    counts
}

/// Replace each span with the mask literal.
///
/// Spans must be sorted and non-overlapping. Replacement does not preserve
/// span length; redaction is the terminal text transform for the document,
/// so nothing downstream depends on original offsets.
fn apply_mask(text: &str, spans: &[PiiSpan], mask: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        out.push_str(mask);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Detector stub that flags occurrences of fixed patterns.
    struct PatternDetector {
        patterns: Vec<(&'static str, &'static str)>,
        calls: AtomicUsize,
    }

    impl PatternDetector {
        fn new(patterns: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                patterns,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PiiDetection for PatternDetector {
        async fn detect(
            &self,
            text: &str,
            _language_code: &str,
        ) -> Result<Vec<PiiSpan>, SummarizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut spans = Vec::new();
            for (pattern, category) in &self.patterns {
                let mut from = 0;
                while let Some(pos) = text[from..].find(pattern) {
                    let start = from + pos;
                    spans.push(PiiSpan {
                        start,
                        end: start + pattern.len(),
                        category: category.to_string(),
                        confidence: 0.99,
                    });
                    from = start + pattern.len();
                }
            }
            spans.sort_by_key(|s| s.start);
            Ok(spans)
        }
    }

    fn span(start: usize, end: usize, category: &str, confidence: f32) -> PiiSpan {
        PiiSpan {
            start,
            end,
            category: category.to_string(),
            confidence,
        }
    }

    fn config_with_mode(mode: PiiMode) -> PipelineConfig {
        PipelineConfig {
            pii_mode: mode,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn merge_unions_overlapping_spans() {
        let merged = merge_spans(vec![
            span(0, 10, "NAME", 0.8),
            span(5, 15, "NAME", 0.9),
            span(20, 25, "EMAIL", 0.7),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start, merged[0].end), (0, 15));
        assert_eq!(merged[0].confidence, 0.9);
        assert_eq!((merged[1].start, merged[1].end), (20, 25));
    }

    #[test]
    fn merge_unions_adjacent_spans_of_same_category_only() {
        let merged = merge_spans(vec![
            span(0, 5, "SSN", 0.9),
            span(5, 9, "SSN", 0.9),
            span(9, 12, "EMAIL", 0.9),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start, merged[0].end), (0, 9));
        assert_eq!(merged[0].category, "SSN");
        assert_eq!((merged[1].start, merged[1].end), (9, 12));
    }

    #[test]
    fn mask_replaces_spans_without_preserving_length() {
        let text = "call 555-0100 or 555-0199 now";
        let spans = vec![span(5, 13, "PHONE", 0.9), span(17, 25, "PHONE", 0.9)];
        assert_eq!(
            apply_mask(text, &spans, "[REDACTED]"),
            "call [REDACTED] or [REDACTED] now"
        );
    }

    #[tokio::test]
    async fn off_mode_makes_no_detector_calls() {
        let detector = PatternDetector::new(vec![("a@b.com", "EMAIL")]);
        let config = config_with_mode(PiiMode::Off);
        let (out, detected) = screen("mail a@b.com", &config, &detector).await.unwrap();
        assert_eq!(out, "mail a@b.com");
        assert!(!detected);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn redact_mode_masks_detected_spans() {
        let detector = PatternDetector::new(vec![("123-45-6789", "SSN")]);
        let config = config_with_mode(PiiMode::Redact);
        let (out, detected) = screen("SSN: 123-45-6789", &config, &detector)
            .await
            .unwrap();
        assert_eq!(out, "SSN: [REDACTED]");
        assert!(detected);
    }

    #[tokio::test]
    async fn redaction_is_idempotent() {
        let detector = PatternDetector::new(vec![("123-45-6789", "SSN")]);
        let config = config_with_mode(PiiMode::Redact);
        let (once, _) = screen("SSN: 123-45-6789", &config, &detector)
            .await
            .unwrap();
        let (twice, detected) = screen(&once, &config, &detector).await.unwrap();
        assert_eq!(once, twice);
        assert!(!detected);
    }

    #[tokio::test]
    async fn block_mode_reports_category_counts() {
        let detector =
            PatternDetector::new(vec![("123-45-6789", "SSN"), ("a@b.com", "EMAIL")]);
        let config = config_with_mode(PiiMode::Block);
        let err = screen("SSN 123-45-6789, mail a@b.com and b@c.com", &config, &detector)
            .await
            .unwrap_err();
        match err {
            SummarizeError::PiiDetected { counts } => {
                assert_eq!(counts.get("SSN"), Some(&1));
                assert_eq!(counts.get("EMAIL"), Some(&1));
            }
            other => panic!("expected PiiDetected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn block_mode_passes_clean_text_through() {
        let detector = PatternDetector::new(vec![("123-45-6789", "SSN")]);
        let config = config_with_mode(PiiMode::Block);
        let (out, detected) = screen("nothing sensitive here", &config, &detector)
            .await
            .unwrap();
        assert_eq!(out, "nothing sensitive here");
        assert!(!detected);
    }

    #[tokio::test]
    async fn spans_straddle_chunk_boundaries_via_offsets() {
        // Small chunk budget forces multiple detector calls; offsets from
        // each chunk must land back in full-text coordinates.
        let detector = PatternDetector::new(vec![("a@b.com", "EMAIL")]);
        let config = PipelineConfig {
            pii_mode: PiiMode::Redact,
            pii_chunk_bytes: 16,
            ..PipelineConfig::default()
        };
        let text = "first a@b.com then some filler text a@b.com end";
        let (out, detected) = screen(text, &config, &detector).await.unwrap();
        assert!(detected);
        assert!(!out.contains("a@b.com"));
        assert_eq!(out.matches("[REDACTED]").count(), 2);
        assert!(detector.calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_not_screened() {
        let detector = PatternDetector::new(vec![("a@b.com", "EMAIL")]);
        let config = config_with_mode(PiiMode::Redact);
        let (out, detected) = screen("   \n  ", &config, &detector).await.unwrap();
        assert_eq!(out, "   \n  ");
        assert!(!detected);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }
}

//! Pipeline orchestrator.
//!
//! Sequences resolve → extract → screen → invoke and is the sole public
//! entry point. Each stage either produces a fully valid output for the
//! next or fails the run; no stage is skipped or reordered. Runs share no
//! mutable state, so independent pipelines may execute concurrently.
//!
//! The three external services plus the object store and the clock are
//! injected as trait objects: production wiring comes from
//! [`Pipeline::aws`], tests substitute doubles.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::bedrock::BedrockClient;
use crate::clock::{Clock, SystemClock};
use crate::comprehend::ComprehendClient;
use crate::config::PipelineConfig;
use crate::error::SummarizeError;
use crate::extract::{self, TextExtraction};
use crate::invoke::{self, Inference};
use crate::models::{DocumentReference, ExtractedDocument, SummaryResult};
use crate::object_store::{ObjectStore, S3Client};
use crate::pii::{self, PiiDetection};
use crate::source::{self, ResolvedSource};
use crate::textract::TextractClient;

/// One summarization pipeline with its resolved service handles.
pub struct Pipeline {
    extraction: Arc<dyn TextExtraction>,
    detector: Arc<dyn PiiDetection>,
    inference: Arc<dyn Inference>,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Assemble a pipeline from explicit service handles.
    pub fn new(
        extraction: Arc<dyn TextExtraction>,
        detector: Arc<dyn PiiDetection>,
        inference: Arc<dyn Inference>,
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            extraction,
            detector,
            inference,
            store,
            clock,
        }
    }

    /// Wire the real AWS clients from environment credentials and config.
    pub fn aws(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(TextractClient::new(config)?),
            Arc::new(ComprehendClient::new(config)?),
            Arc::new(BedrockClient::new(config)?),
            Arc::new(S3Client::new(config)?),
            Arc::new(SystemClock),
        ))
    }

    /// Summarize already-extracted text: screen, then invoke.
    pub async fn summarize_text(
        &self,
        text: &str,
        config: &PipelineConfig,
    ) -> Result<SummaryResult, SummarizeError> {
        config.validate()?;
        self.screen_and_invoke(text, config).await
    }

    /// Summarize a document reference through the full pipeline.
    pub async fn summarize_document(
        &self,
        reference: DocumentReference,
        config: &PipelineConfig,
    ) -> Result<SummaryResult, SummarizeError> {
        config.validate()?;

        let resolved = source::resolve(reference, self.store.as_ref()).await?;
        let document = self.extract(resolved, config).await?;
        info!(
            format = document.format.as_str(),
            source_bytes = document.source_size,
            text_bytes = document.text.len(),
            "document extracted"
        );

        self.screen_and_invoke(&document.text, config).await
    }

    async fn extract(
        &self,
        resolved: ResolvedSource,
        config: &PipelineConfig,
    ) -> Result<ExtractedDocument, SummarizeError> {
        match resolved {
            ResolvedSource::Bytes { bytes, format } => {
                extract::extract(&bytes, format, self.extraction.as_ref()).await
            }
            ResolvedSource::RemotePdf { bucket, key } => {
                extract::extract_remote_pdf(
                    self.extraction.as_ref(),
                    self.clock.as_ref(),
                    &bucket,
                    &key,
                    config.poll_interval(),
                    config.poll_timeout(),
                )
                .await
            }
        }
    }

    async fn screen_and_invoke(
        &self,
        text: &str,
        config: &PipelineConfig,
    ) -> Result<SummaryResult, SummarizeError> {
        let (final_text, detected) =
            pii::screen(text, config, self.detector.as_ref()).await?;
        info!(
            pii_mode = config.pii_mode.as_str(),
            pii_detected = detected,
            "pii screening complete"
        );

        let result =
            invoke::summarize(&final_text, config, self.inference.as_ref(), self.clock.as_ref())
                .await?;
        info!(summary_bytes = result.summary_text.len(), "summary generated");
        Ok(result)
    }
}

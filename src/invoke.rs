//! Summarization invoker.
//!
//! Builds the summarization prompt and calls the inference endpoint.
//! Documents over the per-call input budget are split with the canonical
//! chunker, each chunk summarized independently and the partial summaries
//! combined in a final pass. Prompt construction is deterministic given
//! identical chunk boundaries.
//!
//! Transient failures (throttling, server errors, network) are retried with
//! exponential backoff up to the configured budget; request-validation and
//! permission failures propagate immediately.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chunk::chunk_text;
use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::error::SummarizeError;
use crate::models::SummaryResult;

/// System prompt sent with every invocation.
pub const SYSTEM_PROMPT: &str =
    "You are a document summarization assistant. Output only the summary, no preamble.";

/// A single inference request.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model_id: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Inference failure, classified for retry.
#[derive(Debug)]
pub enum InferenceError {
    /// Throttling, server error, or network failure; worth retrying.
    Transient(String),
    /// Invalid model id, malformed request, permission denied; never retried.
    Fatal(String),
}

/// Inference endpoint boundary.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Invoke the model once, non-streaming; returns the generated text.
    async fn converse(&self, request: &InferenceRequest) -> Result<String, InferenceError>;
}

/// Summarize `text`, chunking when it exceeds the input budget.
///
/// Empty or whitespace-only input yields an empty summary without any
/// endpoint call.
pub async fn summarize(
    text: &str,
    config: &PipelineConfig,
    inference: &dyn Inference,
    clock: &dyn Clock,
) -> Result<SummaryResult, SummarizeError> {
    if text.trim().is_empty() {
        return Ok(SummaryResult {
            summary_text: String::new(),
        });
    }

    if text.len() <= config.max_input_bytes {
        let summary_text =
            invoke_with_retry(&request_for(document_prompt(text), config), config, inference, clock)
                .await?;
        return Ok(SummaryResult { summary_text });
    }

    // Map/reduce: summarize each chunk, then combine the partials.
    let chunks = chunk_text(text, config.max_input_bytes);
    info!(chunks = chunks.len(), "input exceeds budget, summarizing per chunk");
    let mut partials = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let partial = invoke_with_retry(
            &request_for(section_prompt(&chunk.text), config),
            config,
            inference,
            clock,
        )
        .await?;
        partials.push(partial);
    }

    let summary_text = invoke_with_retry(
        &request_for(combine_prompt(&partials.join("\n\n")), config),
        config,
        inference,
        clock,
    )
    .await?;
    Ok(SummaryResult { summary_text })
}

/// Call the endpoint with bounded exponential backoff.
///
/// Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5), sleeping through the
/// injected clock. Fatal errors propagate on the first attempt; the last
/// transient error surfaces once the budget is exhausted.
async fn invoke_with_retry(
    request: &InferenceRequest,
    config: &PipelineConfig,
    inference: &dyn Inference,
    clock: &dyn Clock,
) -> Result<String, SummarizeError> {
    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            clock.sleep(delay).await;
        }

        match inference.converse(request).await {
            Ok(text) => {
                debug!(attempt = attempt + 1, "invocation succeeded");
                return Ok(text);
            }
            Err(InferenceError::Transient(e)) => {
                warn!(attempt = attempt + 1, error = %e, "transient invocation failure, retrying");
                last_err = Some(e);
            }
            Err(InferenceError::Fatal(e)) => {
                return Err(SummarizeError::Invocation(e));
            }
        }
    }

    Err(SummarizeError::Invocation(
        last_err.unwrap_or_else(|| "invocation failed after retries".to_string()),
    ))
}

fn request_for(prompt: String, config: &PipelineConfig) -> InferenceRequest {
    InferenceRequest {
        model_id: config.model_id.clone(),
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

fn document_prompt(text: &str) -> String {
    format!(
        "Summarize the following document concisely. Preserve key facts and conclusions. \
         Do not add commentary or meta text.\n\n{}",
        text
    )
}

fn section_prompt(text: &str) -> String {
    format!(
        "Summarize the following section of a larger document concisely. Preserve key facts \
         and conclusions. Do not add commentary or meta text.\n\n{}",
        text
    )
}

fn combine_prompt(partials: &str) -> String {
    format!(
        "The following are summaries of consecutive sections of one document. Combine them \
         into a single concise summary. Preserve key facts and conclusions. Do not add \
         commentary or meta text.\n\n{}",
        partials
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    struct TestClock {
        start: Instant,
        advanced: Mutex<Duration>,
        slept: Mutex<Vec<Duration>>,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                advanced: Mutex::new(Duration::ZERO),
                slept: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.start + *self.advanced.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            *self.advanced.lock().unwrap() += duration;
            self.slept.lock().unwrap().push(duration);
        }
    }

    /// Inference stub that fails transiently `failures` times, then echoes
    /// a fixed summary. Captures every prompt it is sent.
    struct FlakyInference {
        failures: AtomicUsize,
        attempts: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fatal: bool,
    }

    impl FlakyInference {
        fn new(failures: usize, fatal: bool) -> Self {
            Self {
                failures: AtomicUsize::new(failures),
                attempts: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                fatal,
            }
        }
    }

    #[async_trait]
    impl Inference for FlakyInference {
        async fn converse(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return if self.fatal {
                    Err(InferenceError::Fatal("ValidationException".to_string()))
                } else {
                    Err(InferenceError::Transient("ThrottlingException".to_string()))
                };
            }
            Ok("a summary".to_string())
        }
    }

    #[tokio::test]
    async fn succeeds_after_two_transient_failures() {
        let inference = FlakyInference::new(2, false);
        let clock = TestClock::new();
        let config = PipelineConfig::default();
        let result = summarize("some document text", &config, &inference, &clock)
            .await
            .unwrap();
        assert_eq!(result.summary_text, "a summary");
        assert_eq!(inference.attempts.load(Ordering::SeqCst), 3);
        // Exponential backoff between attempts.
        assert_eq!(
            *clock.slept.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let inference = FlakyInference::new(1, true);
        let clock = TestClock::new();
        let config = PipelineConfig::default();
        let err = summarize("some document text", &config, &inference, &clock)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Invocation(_)));
        assert_eq!(inference.attempts.load(Ordering::SeqCst), 1);
        assert!(clock.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_transient_error() {
        let inference = FlakyInference::new(usize::MAX, false);
        let clock = TestClock::new();
        let config = PipelineConfig {
            max_retries: 2,
            ..PipelineConfig::default()
        };
        let err = summarize("text", &config, &inference, &clock)
            .await
            .unwrap_err();
        match err {
            SummarizeError::Invocation(msg) => assert!(msg.contains("ThrottlingException")),
            other => panic!("expected Invocation, got {:?}", other),
        }
        assert_eq!(inference.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_input_skips_the_endpoint() {
        let inference = FlakyInference::new(0, false);
        let clock = TestClock::new();
        let config = PipelineConfig::default();
        let result = summarize("   \n", &config, &inference, &clock).await.unwrap();
        assert_eq!(result.summary_text, "");
        assert_eq!(inference.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_call_embeds_document_in_prompt() {
        let inference = FlakyInference::new(0, false);
        let clock = TestClock::new();
        let config = PipelineConfig::default();
        summarize("the document body", &config, &inference, &clock)
            .await
            .unwrap();
        let prompts = inference.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Summarize the following document"));
        assert!(prompts[0].ends_with("the document body"));
    }

    #[tokio::test]
    async fn oversized_input_is_summarized_per_chunk_then_combined() {
        let inference = FlakyInference::new(0, false);
        let clock = TestClock::new();
        let config = PipelineConfig {
            max_input_bytes: 32,
            ..PipelineConfig::default()
        };
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        summarize(text, &config, &inference, &clock).await.unwrap();

        let prompts = inference.prompts.lock().unwrap();
        // N section passes plus one combine pass.
        assert!(prompts.len() > 2);
        let (sections, combine) = prompts.split_at(prompts.len() - 1);
        for prompt in sections {
            assert!(prompt.contains("section of a larger document"));
        }
        assert!(combine[0].contains("Combine them"));
        assert!(combine[0].contains("a summary"));
    }
}

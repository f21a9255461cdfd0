//! # Doc Summarizer
//!
//! Summarizes one document per invocation: plain text, PDF, or Word
//! (`.docx`), supplied as a local path, an `s3://` URI, stdin bytes, or
//! inline text. Text is extracted per format, optionally screened and
//! redacted for personally identifiable information, and summarized
//! through a hosted model endpoint.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌───────────┐   ┌─────────┐
//! │ Resolver │──▶│ Extractor │──▶│ Chunker │──▶│ Screener/ │──▶│ Invoker │
//! │ path/S3/ │   │ utf-8 /   │   │ byte    │   │ Redactor  │   │ retry + │
//! │ stdin    │   │ docx/pdf  │   │ budget  │   │ PII spans │   │ backoff │
//! └──────────┘   └───────────┘   └─────────┘   └───────────┘   └─────────┘
//! ```
//!
//! PDF extraction runs through Amazon Textract (synchronous for local
//! single-page files, an asynchronous polled job for object-store
//! documents), PII detection through Amazon Comprehend, and summarization
//! through the Amazon Bedrock Converse API. All three are reached behind
//! trait boundaries so test doubles can stand in; see [`pipeline::Pipeline`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Pipeline configuration with defaults and validation |
//! | [`models`] | Core data types |
//! | [`source`] | Input reference resolution and format detection |
//! | [`extract`] | Per-format extraction and the async job state machine |
//! | [`chunk`] | Byte-budget, offset-preserving text chunking |
//! | [`pii`] | PII span detection, merging, and redaction policy |
//! | [`invoke`] | Prompt construction and retry/backoff invocation |
//! | [`pipeline`] | Orchestration and service wiring |
//! | [`sigv4`] | AWS request signing |
//! | [`textract`], [`comprehend`], [`bedrock`], [`object_store`] | Service clients |
//! | [`clock`] | Injectable time source for polling and backoff |

pub mod bedrock;
pub mod chunk;
pub mod clock;
pub mod comprehend;
pub mod config;
pub mod error;
pub mod extract;
pub mod invoke;
pub mod models;
pub mod object_store;
pub mod pii;
pub mod pipeline;
pub mod sigv4;
pub mod source;
pub mod textract;

pub use config::{PiiMode, PipelineConfig};
pub use error::SummarizeError;
pub use models::{DocumentReference, SummaryResult};
pub use pipeline::Pipeline;

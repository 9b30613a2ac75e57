//! # resumelens
//!
//! Submit a résumé and a job description; get back a stored preview image
//! and a structured, job-targeted AI critique.
//!
//! ## Why this crate?
//!
//! A résumé is judged on more than its words: layout, typography, and
//! section structure decide whether a recruiter (or an ATS) reads it at
//! all. resumelens rasterises the first page into a high-fidelity PNG and
//! lets a vision model review it the way a human screener would, scoring
//! the result against a specific job description.
//!
//! ## Pipeline Overview
//!
//! ```text
//! resume.pdf
//!  │
//!  ├─ 1. Upload    raw resume → object storage
//!  ├─ 2. Convert   first page → 4× PNG via pdfium (engine acquired lazily,
//!  │               once per process, shared by all submissions)
//!  ├─ 3. Upload    preview image → object storage
//!  ├─ 4. Record    id + paths + job context, persisted (feedback: null)
//!  ├─ 5. Analyze   vision LLM critiques the resume against the job
//!  ├─ 6. Parse     critique text → structured JSON
//!  └─ 7. Persist   record rewritten with feedback attached
//! ```
//!
//! Every step either succeeds into the next or fails the submission with a
//! stage-specific, user-displayable status; nothing after a failed stage
//! runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resumelens::services::local::{DirStorage, JsonDirKv};
//! use resumelens::services::vision::VisionFeedback;
//! use resumelens::{SourceDocument, SubmissionConfig, SubmissionPipeline, SubmissionRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SubmissionConfig::default();
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let ai = VisionFeedback::from_config(&config)?;
//!
//!     let pipeline = SubmissionPipeline::new(
//!         Arc::new(DirStorage::new("submissions/files")),
//!         Arc::new(JsonDirKv::new("submissions/records")),
//!         Arc::new(ai),
//!     )
//!     .with_config(config);
//!
//!     let outcome = pipeline
//!         .submit(SubmissionRequest {
//!             company_name: "Acme".into(),
//!             job_title: "Staff Engineer".into(),
//!             job_description: "Design and ship Rust services.".into(),
//!             resume: SourceDocument::from_path("resume.pdf").await?,
//!         })
//!         .await?;
//!
//!     println!("submission {}", outcome.id);
//!     println!("{}", serde_json::to_string_pretty(&outcome.record)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resumelens` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resumelens = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod rasterize;
pub mod record;
pub mod services;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{is_url, resolve_source, FileArtifact, SourceDocument};
pub use config::{SubmissionConfig, SubmissionConfigBuilder};
pub use engine::{acquire as acquire_engine, EngineHandle, EngineLoader};
pub use error::{EngineError, RasterizeError, SubmitError};
pub use feedback::{ContentPart, FeedbackMessage, FeedbackResponse, MessageContent};
pub use pipeline::{
    SubmissionOutcome, SubmissionPhase, SubmissionPipeline, SubmissionRequest, SubmissionStats,
};
pub use progress::{NoopProgress, ProgressHandle, SubmissionProgress};
pub use rasterize::{rasterize_first_page, ConversionResult, PdfiumRasterizer, Rasterizer};
pub use record::SubmissionRecord;

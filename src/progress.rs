//! Progress-observer trait for submission status transitions.
//!
//! Inject an `Arc<dyn SubmissionProgress>` via
//! [`crate::pipeline::SubmissionPipeline::with_progress`] to receive the
//! status label and busy flag at every phase transition — suitable for
//! driving a UI, a log line, or a terminal spinner.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: callers can
//! forward transitions to a broadcast channel, a WebSocket, or a progress
//! bar without the library knowing how the host application communicates.
//! The trait is `Send + Sync`; a submission reports transitions
//! sequentially, but independent submissions may report concurrently.

use crate::pipeline::SubmissionPhase;
use std::sync::Arc;

/// Called by the pipeline as a submission advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SubmissionProgress: Send + Sync {
    /// Called at every phase transition, including the terminal
    /// `Complete` / `Failed` phases. `phase.label()` is the human-readable
    /// status string and `phase.is_busy()` the busy flag.
    fn on_status(&self, phase: &SubmissionPhase) {
        let _ = phase;
    }

    /// Called when validation rejects the request. The pipeline never
    /// started and the busy state was never entered.
    fn on_invalid(&self, message: &str) {
        let _ = message;
    }

    /// Called once after a successful run, with the generated submission id.
    fn on_complete(&self, id: &str) {
        let _ = id;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl SubmissionProgress for NoopProgress {}

/// Convenience alias matching the type the pipeline stores.
pub type ProgressHandle = Arc<dyn SubmissionProgress>;

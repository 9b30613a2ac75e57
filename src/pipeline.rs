//! The submission pipeline: an explicit linear state machine.
//!
//! ## Shape
//!
//! ```text
//! Idle ─▶ UploadingResume ─▶ ConvertingImage ─▶ UploadingImage
//!      ─▶ PreparingRecord ─▶ PersistingInitial ─▶ Analyzing
//!      ─▶ ParsingFeedback ─▶ PersistingFinal ─▶ Complete
//!                      │
//!                      └──(any stage error)──▶ Failed
//! ```
//!
//! Each stage returns `Result<next phase, SubmitError>`; a driver loop
//! advances on `Ok` and jumps to the absorbing `Failed` phase on the first
//! `Err`, so "stop on first failure, advance only on success" is enforced
//! by structure rather than convention. No stage retries, and no stage
//! after a failing one is ever invoked.
//!
//! Stages run strictly sequentially within one submission; concurrent
//! submissions are independent, uncoordinated pipelines. The only shared
//! state is the rendering engine behind [`crate::engine::acquire`].

use crate::artifact::{FileArtifact, SourceDocument};
use crate::config::SubmissionConfig;
use crate::error::SubmitError;
use crate::feedback::{self, FeedbackResponse};
use crate::progress::{NoopProgress, ProgressHandle};
use crate::prompts;
use crate::rasterize::{ConversionResult, PdfiumRasterizer, Rasterizer};
use crate::record::SubmissionRecord;
use crate::services::{FeedbackService, KvStore, ObjectStorage, ServiceError, ServiceResult, StoredObject};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ── Phases ───────────────────────────────────────────────────────────────

/// The pipeline's observable phase: a human-readable label plus a busy flag,
/// advancing monotonically on success and jumping to `Failed` on the first
/// stage error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    UploadingResume,
    ConvertingImage,
    UploadingImage,
    PreparingRecord,
    PersistingInitial,
    Analyzing,
    ParsingFeedback,
    PersistingFinal,
    Complete,
    Failed(String),
}

impl SubmissionPhase {
    /// Status string suitable for direct display.
    pub fn label(&self) -> String {
        match self {
            SubmissionPhase::Idle => "Ready".to_string(),
            SubmissionPhase::UploadingResume => "Uploading the resume...".to_string(),
            SubmissionPhase::ConvertingImage => "Converting to image...".to_string(),
            SubmissionPhase::UploadingImage => "Uploading the image...".to_string(),
            SubmissionPhase::PreparingRecord => "Preparing data...".to_string(),
            SubmissionPhase::PersistingInitial => "Saving the submission...".to_string(),
            SubmissionPhase::Analyzing => "Analyzing the resume...".to_string(),
            SubmissionPhase::ParsingFeedback => "Reading the feedback...".to_string(),
            SubmissionPhase::PersistingFinal => "Saving the feedback...".to_string(),
            SubmissionPhase::Complete => "Analysis complete".to_string(),
            SubmissionPhase::Failed(message) => format!("Error: {message}"),
        }
    }

    /// True while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        !matches!(
            self,
            SubmissionPhase::Idle | SubmissionPhase::Complete | SubmissionPhase::Failed(_)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionPhase::Complete | SubmissionPhase::Failed(_))
    }
}

// ── Request / outcome ────────────────────────────────────────────────────

/// Caller input for one submission.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub resume: SourceDocument,
}

impl SubmissionRequest {
    /// Check the required fields. The pipeline refuses to start (and never
    /// touches a collaborator) when any is missing.
    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.company_name.trim().is_empty() {
            return Err(SubmitError::Validation { field: "a company name" });
        }
        if self.job_title.trim().is_empty() {
            return Err(SubmitError::Validation { field: "a job title" });
        }
        if self.job_description.trim().is_empty() {
            return Err(SubmitError::Validation { field: "a job description" });
        }
        if self.resume.bytes.is_empty() {
            return Err(SubmitError::Validation { field: "a resume" });
        }
        Ok(())
    }
}

/// Wall-clock accounting for one successful submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionStats {
    pub total_duration_ms: u64,
    pub convert_duration_ms: u64,
    pub analysis_duration_ms: u64,
}

/// Result of a successful run. The caller navigates to its results view
/// keyed by `id`; the pipeline retains nothing.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub id: String,
    pub record: SubmissionRecord,
    pub preview_uri: String,
    pub stats: SubmissionStats,
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// Orchestrates one submission over the collaborator traits.
///
/// Construct with [`SubmissionPipeline::new`] and customise with the
/// `with_*` methods:
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use resumelens::services::local::{DirStorage, JsonDirKv};
/// # use resumelens::services::vision::VisionFeedback;
/// # use resumelens::{SubmissionConfig, SubmissionPipeline};
/// # fn demo(ai: VisionFeedback) {
/// let pipeline = SubmissionPipeline::new(
///     Arc::new(DirStorage::new("submissions/files")),
///     Arc::new(JsonDirKv::new("submissions/records")),
///     Arc::new(ai),
/// )
/// .with_config(SubmissionConfig::default());
/// # }
/// ```
pub struct SubmissionPipeline {
    storage: Arc<dyn ObjectStorage>,
    kv: Arc<dyn KvStore>,
    ai: Arc<dyn FeedbackService>,
    rasterizer: Arc<dyn Rasterizer>,
    config: SubmissionConfig,
    progress: ProgressHandle,
}

impl SubmissionPipeline {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        kv: Arc<dyn KvStore>,
        ai: Arc<dyn FeedbackService>,
    ) -> Self {
        Self {
            storage,
            kv,
            ai,
            rasterizer: Arc::new(PdfiumRasterizer),
            config: SubmissionConfig::default(),
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_config(mut self, config: SubmissionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = progress;
        self
    }

    /// Substitute the conversion backend (tests, alternative engines).
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Run one submission to completion or first failure.
    ///
    /// Every phase transition is reported through the progress observer;
    /// on failure the terminal status carries the stage-specific message
    /// and the busy flag is clear.
    pub async fn submit(
        &self,
        request: SubmissionRequest,
    ) -> Result<SubmissionOutcome, SubmitError> {
        if let Err(err) = request.validate() {
            self.progress.on_invalid(&err.to_string());
            return Err(err);
        }

        info!(
            "Submission started: '{}' at '{}'",
            request.job_title, request.company_name
        );
        let total_start = Instant::now();
        let mut ctx = StageContext::new(request);
        let mut phase = SubmissionPhase::UploadingResume;

        loop {
            self.progress.on_status(&phase);
            if phase == SubmissionPhase::Complete {
                break;
            }
            match self.run_stage(&phase, &mut ctx).await {
                Ok(next) => phase = next,
                Err(err) => {
                    warn!("Submission failed during {:?}: {}", phase, err);
                    self.progress
                        .on_status(&SubmissionPhase::Failed(err.to_string()));
                    return Err(err);
                }
            }
        }

        let record = ctx
            .record
            .take()
            .ok_or_else(|| SubmitError::Internal("record missing after completion".into()))?;
        let stats = SubmissionStats {
            total_duration_ms: total_start.elapsed().as_millis() as u64,
            convert_duration_ms: ctx.convert_duration_ms,
            analysis_duration_ms: ctx.analysis_duration_ms,
        };

        info!(
            "Submission {} complete in {}ms",
            record.id, stats.total_duration_ms
        );
        self.progress.on_complete(&record.id);

        Ok(SubmissionOutcome {
            id: record.id.clone(),
            preview_uri: std::mem::take(&mut ctx.preview_uri),
            record,
            stats,
        })
    }

    /// Execute one stage and name its successor.
    async fn run_stage(
        &self,
        phase: &SubmissionPhase,
        ctx: &mut StageContext,
    ) -> Result<SubmissionPhase, SubmitError> {
        match phase {
            SubmissionPhase::UploadingResume => {
                let files = [ctx.request.resume.as_artifact()];
                let result = self.bounded(self.storage.upload(&files)).await;
                let path = stored_path(result)
                    .map_err(|detail| SubmitError::ResumeUpload { detail })?;
                debug!("Resume stored at {}", path);
                ctx.resume_path = Some(path);
                Ok(SubmissionPhase::ConvertingImage)
            }

            SubmissionPhase::ConvertingImage => {
                let convert_start = Instant::now();
                let ConversionResult {
                    image,
                    preview_uri,
                    error,
                } = self
                    .rasterizer
                    .rasterize_first_page(&ctx.request.resume)
                    .await;
                ctx.convert_duration_ms = convert_start.elapsed().as_millis() as u64;

                match image {
                    Some(image) => {
                        ctx.preview_uri = preview_uri;
                        ctx.image = Some(image);
                        Ok(SubmissionPhase::UploadingImage)
                    }
                    None => Err(SubmitError::Convert {
                        detail: error
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "no image artifact produced".to_string()),
                    }),
                }
            }

            SubmissionPhase::UploadingImage => {
                // take(): the raster buffers are scoped to this conversion
                // and released once the upload hands back a path.
                let image = ctx
                    .image
                    .take()
                    .ok_or_else(|| SubmitError::Internal("image artifact missing".into()))?;
                let files = [image];
                let result = self.bounded(self.storage.upload(&files)).await;
                let path =
                    stored_path(result).map_err(|detail| SubmitError::ImageUpload { detail })?;
                debug!("Preview image stored at {}", path);
                ctx.image_path = Some(path);
                Ok(SubmissionPhase::PreparingRecord)
            }

            SubmissionPhase::PreparingRecord => {
                let id = Uuid::new_v4().to_string();
                let resume_path = ctx
                    .resume_path
                    .clone()
                    .ok_or_else(|| SubmitError::Internal("resume path missing".into()))?;
                let image_path = ctx
                    .image_path
                    .clone()
                    .ok_or_else(|| SubmitError::Internal("image path missing".into()))?;
                ctx.record = Some(SubmissionRecord::new(
                    id,
                    resume_path,
                    image_path,
                    ctx.request.company_name.clone(),
                    ctx.request.job_title.clone(),
                    ctx.request.job_description.clone(),
                ));
                Ok(SubmissionPhase::PersistingInitial)
            }

            SubmissionPhase::PersistingInitial => {
                self.persist_record(ctx).await?;
                Ok(SubmissionPhase::Analyzing)
            }

            SubmissionPhase::Analyzing => {
                let resume_path = ctx
                    .resume_path
                    .clone()
                    .ok_or_else(|| SubmitError::Internal("resume path missing".into()))?;
                let instructions = match &self.config.instructions {
                    Some(custom) => custom.clone(),
                    None => prompts::prepare_instructions(
                        &ctx.request.job_title,
                        &ctx.request.job_description,
                    ),
                };

                let analysis_start = Instant::now();
                let response = self
                    .bounded(self.ai.feedback(&resume_path, &instructions))
                    .await
                    .map_err(|e| SubmitError::Analysis { detail: e.to_string() })?;
                ctx.analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;

                ctx.response = Some(response);
                Ok(SubmissionPhase::ParsingFeedback)
            }

            SubmissionPhase::ParsingFeedback => {
                let response = ctx
                    .response
                    .take()
                    .ok_or_else(|| SubmitError::Internal("feedback response missing".into()))?;
                let text = response
                    .message
                    .content
                    .extract_text()
                    .ok_or(SubmitError::FeedbackMissing)?;
                let parsed = feedback::parse_feedback(text)
                    .map_err(|e| SubmitError::FeedbackParse { detail: e.to_string() })?;

                let record = ctx
                    .record
                    .as_mut()
                    .ok_or_else(|| SubmitError::Internal("record missing".into()))?;
                record.attach_feedback(parsed);
                Ok(SubmissionPhase::PersistingFinal)
            }

            SubmissionPhase::PersistingFinal => {
                self.persist_record(ctx).await?;
                Ok(SubmissionPhase::Complete)
            }

            SubmissionPhase::Idle
            | SubmissionPhase::Complete
            | SubmissionPhase::Failed(_) => Err(SubmitError::Internal(format!(
                "pipeline driver entered {phase:?}"
            ))),
        }
    }

    /// Serialise the current record and write it under its stable key.
    ///
    /// Used by both persist stages; the second call overwrites the first
    /// under the same key, now with feedback attached.
    async fn persist_record(&self, ctx: &mut StageContext) -> Result<(), SubmitError> {
        let record = ctx
            .record
            .as_ref()
            .ok_or_else(|| SubmitError::Internal("record missing".into()))?;
        let key = record.kv_key(&self.config.key_prefix);
        let value = serde_json::to_string(record)
            .map_err(|e| SubmitError::Internal(format!("record serialisation: {e}")))?;

        self.bounded(self.kv.set(&key, &value))
            .await
            .map_err(|e| SubmitError::Persist {
                key: key.clone(),
                detail: e.to_string(),
            })?;
        debug!("Record persisted under '{}'", key);
        Ok(())
    }

    /// Apply the optional per-call deadline to a collaborator future.
    async fn bounded<T>(&self, fut: impl Future<Output = ServiceResult<T>>) -> ServiceResult<T> {
        match self.config.collaborator_timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), fut).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::new(format!(
                    "collaborator call timed out after {secs}s"
                ))),
            },
            None => fut.await,
        }
    }
}

/// Per-submission working state, filled as stages complete.
struct StageContext {
    request: SubmissionRequest,
    resume_path: Option<String>,
    image: Option<FileArtifact>,
    preview_uri: String,
    image_path: Option<String>,
    record: Option<SubmissionRecord>,
    response: Option<FeedbackResponse>,
    convert_duration_ms: u64,
    analysis_duration_ms: u64,
}

impl StageContext {
    fn new(request: SubmissionRequest) -> Self {
        Self {
            request,
            resume_path: None,
            image: None,
            preview_uri: String::new(),
            image_path: None,
            record: None,
            response: None,
            convert_duration_ms: 0,
            analysis_duration_ms: 0,
        }
    }
}

/// Treat both a collaborator error and an empty path as upload failures.
fn stored_path(result: ServiceResult<StoredObject>) -> Result<String, String> {
    match result {
        Ok(stored) if !stored.path.is_empty() => Ok(stored.path),
        Ok(_) => Err("storage returned no path".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::PDF_MEDIA_TYPE;

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            company_name: "Acme".into(),
            job_title: "Staff Engineer".into(),
            job_description: "Build things.".into(),
            resume: SourceDocument::from_bytes("resume.pdf", PDF_MEDIA_TYPE, b"%PDF-1.4".to_vec()),
        }
    }

    #[test]
    fn phases_advance_through_busy_labels() {
        let busy = [
            SubmissionPhase::UploadingResume,
            SubmissionPhase::ConvertingImage,
            SubmissionPhase::UploadingImage,
            SubmissionPhase::PreparingRecord,
            SubmissionPhase::PersistingInitial,
            SubmissionPhase::Analyzing,
            SubmissionPhase::ParsingFeedback,
            SubmissionPhase::PersistingFinal,
        ];
        for phase in &busy {
            assert!(phase.is_busy(), "{phase:?} should be busy");
            assert!(!phase.is_terminal());
            assert!(!phase.label().is_empty());
        }
    }

    #[test]
    fn terminal_phases_clear_the_busy_flag() {
        assert!(!SubmissionPhase::Idle.is_busy());
        assert!(!SubmissionPhase::Complete.is_busy());
        let failed = SubmissionPhase::Failed("storage returned no path".into());
        assert!(!failed.is_busy());
        assert!(failed.is_terminal());
        assert_eq!(failed.label(), "Error: storage returned no path");
    }

    #[test]
    fn validation_names_the_first_missing_field() {
        let mut r = request();
        r.job_title = "  ".into();
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("job title"), "got: {err}");

        let mut r = request();
        r.resume.bytes.clear();
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("resume"));

        assert!(request().validate().is_ok());
    }

    #[test]
    fn stored_path_rejects_empty_and_errors() {
        assert_eq!(
            stored_path(Ok(StoredObject { path: "/a/b".into() })).unwrap(),
            "/a/b"
        );
        assert_eq!(
            stored_path(Ok(StoredObject { path: String::new() })).unwrap_err(),
            "storage returned no path"
        );
        assert_eq!(
            stored_path(Err(ServiceError::new("disk full"))).unwrap_err(),
            "disk full"
        );
    }
}

//! Error types for the resumelens library.
//!
//! Three distinct error types reflect three distinct failure scopes:
//!
//! * [`SubmitError`] — **Fatal to one submission**: the pipeline stops at the
//!   failing stage, reports a terminal status, and returns this. Nothing after
//!   the failing stage runs.
//!
//! * [`RasterizeError`] — **Conversion-component failure**: produced inside
//!   the document rasterizer and carried in
//!   [`crate::rasterize::ConversionResult`] rather than thrown across the
//!   component boundary. `Clone` so the uniform result stays cheap to pass
//!   around.
//!
//! * [`EngineError`] — **Loader failure**: the rasterization engine could not
//!   be initialised. `Clone` because a single failed initialisation is
//!   delivered to every caller that was waiting on it.
//!
//! The separation keeps the rasterizer's "never throws, inspect the artifact
//! field" contract intact while the pipeline still gets stage-specific
//! messages for its status label.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by a submission run.
///
/// Conversion-internal failures use [`RasterizeError`] and surface here only
/// as [`SubmitError::Convert`] once the pipeline observes a missing artifact.
#[derive(Debug, Error)]
pub enum SubmitError {
    // ── Validation ────────────────────────────────────────────────────────
    /// A required input was missing or blank. The pipeline never started and
    /// no collaborator was invoked.
    #[error("Please provide {field} before submitting.")]
    Validation { field: &'static str },

    // ── Source resolution errors ──────────────────────────────────────────
    /// Résumé file was not found at the given path.
    #[error("Resume file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the résumé file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// The storage collaborator returned no usable path for the résumé.
    #[error("Failed to upload the resume: {detail}")]
    ResumeUpload { detail: String },

    /// The rasterizer produced no image artifact.
    #[error("Failed to convert the resume to an image: {detail}")]
    Convert { detail: String },

    /// The storage collaborator returned no usable path for the preview image.
    #[error("Failed to upload the preview image: {detail}")]
    ImageUpload { detail: String },

    /// The key-value collaborator rejected a write.
    #[error("Failed to save submission '{key}': {detail}")]
    Persist { key: String, detail: String },

    /// The AI collaborator returned no response.
    #[error("Resume analysis failed: {detail}")]
    Analysis { detail: String },

    /// No LLM provider could be constructed for the feedback service.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The AI response carried no usable feedback text.
    #[error("The analysis response contained no feedback text")]
    FeedbackMissing,

    /// The feedback text was not valid structured data.
    #[error("Feedback was not valid JSON: {detail}")]
    FeedbackParse { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, serialisation failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures inside the document rasterizer.
///
/// Never crosses the rasterizer boundary as an `Err`; it is stored in
/// [`crate::rasterize::ConversionResult::error`] so callers distinguish
/// success from failure by inspecting the artifact field.
#[derive(Debug, Clone, Error)]
pub enum RasterizeError {
    /// The rendering engine could not be acquired.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The bytes were not a well-formed paginated document, or page 1 could
    /// not be retrieved from an otherwise-open document.
    #[error("Not a readable PDF document: {detail}")]
    Parse { detail: String },

    /// The engine reported an error while rendering the page.
    #[error("Page render failed: {detail}")]
    Render { detail: String },

    /// The rendered surface could not be encoded as an image.
    #[error("Could not encode the rendered page: {detail}")]
    Encode { detail: String },
}

/// Failures initialising the rasterization engine.
///
/// `Clone` by design: one failed initialisation is handed to every caller
/// that joined the in-flight attempt.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to the pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or place the platform library\n\
(libpdfium.so / libpdfium.dylib / pdfium.dll) next to the executable.\n"
    )]
    Bind(String),

    /// The initialisation task itself failed to run.
    #[error("Engine initialisation task failed: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_field() {
        let e = SubmitError::Validation { field: "a job title" };
        assert!(e.to_string().contains("a job title"), "got: {e}");
    }

    #[test]
    fn persist_display_includes_key() {
        let e = SubmitError::Persist {
            key: "resume:abc".into(),
            detail: "disk full".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("resume:abc"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn rasterize_engine_error_is_transparent() {
        let e = RasterizeError::Engine(EngineError::Bind("no library".into()));
        assert!(e.to_string().contains("no library"));
    }

    #[test]
    fn rasterize_error_is_clone() {
        let e = RasterizeError::Parse {
            detail: "bad xref".into(),
        };
        let e2 = e.clone();
        assert_eq!(e.to_string(), e2.to_string());
    }
}

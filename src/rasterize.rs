//! Document rasterization: first page of a résumé → high-fidelity PNG.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the open/render/encode
//! work onto a dedicated thread so the async workers never stall on
//! CPU-heavy rasterization.
//!
//! ## Why 4× scale?
//!
//! Résumé pages are typically US-Letter at 72 points per inch; rendered at
//! native size the text is too coarse for a crisp on-screen preview or for
//! a vision model to read reliably. A fixed 4× magnification yields a
//! ~2500 px-wide page — sharp, and still well under API upload limits. The
//! factor is a design constant, not a per-call knob.
//!
//! ## Never throws
//!
//! [`rasterize_first_page`] always returns a [`ConversionResult`]; every
//! internal failure point (engine, parse, render, encode) is captured in
//! `error` and callers distinguish success from failure by inspecting the
//! `image` field.

use crate::artifact::{FileArtifact, SourceDocument, PNG_MEDIA_TYPE};
use crate::engine::{self, EngineHandle};
use crate::error::RasterizeError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::io::Cursor;
use tracing::{debug, warn};

/// Fixed magnification applied to the page's native viewport.
const RENDER_SCALE: f32 = 4.0;

/// Uniform outcome of one conversion call.
///
/// Exactly one of `image`/`error` is populated. `preview_uri` is a
/// `data:image/png;base64,…` URI on success and empty on failure, so a UI
/// can show the preview without touching the artifact bytes again.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub image: Option<FileArtifact>,
    pub preview_uri: String,
    pub error: Option<RasterizeError>,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.image.is_some()
    }

    /// Human-readable failure description, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    fn success(image: FileArtifact, preview_uri: String) -> Self {
        Self {
            image: Some(image),
            preview_uri,
            error: None,
        }
    }

    fn failure(error: RasterizeError) -> Self {
        Self {
            image: None,
            preview_uri: String::new(),
            error: Some(error),
        }
    }
}

/// Conversion seam used by the submission pipeline.
///
/// [`PdfiumRasterizer`] is the production implementation; tests substitute
/// their own so the pipeline can run without a pdfium library.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize_first_page(&self, doc: &SourceDocument) -> ConversionResult;
}

/// Default rasterizer backed by the shared pdfium engine.
pub struct PdfiumRasterizer;

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn rasterize_first_page(&self, doc: &SourceDocument) -> ConversionResult {
        rasterize_first_page(doc).await
    }
}

/// Convert the first page of `doc` into a PNG artifact.
///
/// Acquires the shared engine (suspending while another caller initialises
/// it), renders page 1 at 4× native scale, and packages the encoded bytes
/// under the source filename with its `.pdf` suffix replaced by `.png`.
pub async fn rasterize_first_page(doc: &SourceDocument) -> ConversionResult {
    match try_rasterize(doc).await {
        Ok(image) => {
            let preview_uri = data_uri(&image);
            debug!(
                "Converted '{}' → '{}' ({} bytes)",
                doc.name,
                image.name,
                image.bytes.len()
            );
            ConversionResult::success(image, preview_uri)
        }
        Err(error) => {
            warn!("Conversion of '{}' failed: {}", doc.name, error);
            ConversionResult::failure(error)
        }
    }
}

async fn try_rasterize(doc: &SourceDocument) -> Result<FileArtifact, RasterizeError> {
    let engine = engine::acquire().await?;
    let bytes = doc.bytes.clone();
    let output_name = image_name(&doc.name);

    tokio::task::spawn_blocking(move || rasterize_blocking(engine, bytes, output_name))
        .await
        .map_err(|e| RasterizeError::Render {
            detail: format!("render task panicked: {e}"),
        })?
}

/// Blocking open → page 1 → render → PNG-encode.
fn rasterize_blocking(
    engine: EngineHandle,
    bytes: Vec<u8>,
    output_name: String,
) -> Result<FileArtifact, RasterizeError> {
    let document = engine
        .pdfium()
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| RasterizeError::Parse {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    debug!("Document opened: {} pages", pages.len());

    // A document that opens but yields no first page is a parse failure.
    let page = pages.get(0).map_err(|e| RasterizeError::Parse {
        detail: format!("no first page: {e:?}"),
    })?;

    let target_width = (page.width().value * RENDER_SCALE).round() as i32;
    // Width-only target keeps the aspect ratio, so both output dimensions
    // land at 4× the native page size within integer rounding.
    let render_config = PdfRenderConfig::new().set_target_width(target_width);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| RasterizeError::Render {
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RasterizeError::Encode {
            detail: e.to_string(),
        })?;

    Ok(FileArtifact {
        name: output_name,
        media_type: PNG_MEDIA_TYPE.to_string(),
        bytes: buf,
    })
}

// ── Naming & preview ─────────────────────────────────────────────────────

static RE_PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// Derive the output filename: strip a trailing `.pdf` (case-insensitive),
/// append `.png`.
pub fn image_name(source_name: &str) -> String {
    format!("{}.png", RE_PDF_SUFFIX.replace(source_name, ""))
}

/// Locally resolvable preview reference for an encoded image.
pub fn data_uri(artifact: &FileArtifact) -> String {
    format!(
        "data:{};base64,{}",
        artifact.media_type,
        STANDARD.encode(&artifact.bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_name_replaces_pdf_suffix() {
        assert_eq!(image_name("resume.pdf"), "resume.png");
    }

    #[test]
    fn image_name_is_case_insensitive_on_the_suffix() {
        assert_eq!(image_name("Resume.PDF"), "Resume.png");
        assert_eq!(image_name("cv.Pdf"), "cv.png");
    }

    #[test]
    fn image_name_appends_when_no_pdf_suffix() {
        assert_eq!(image_name("resume.docx"), "resume.docx.png");
        assert_eq!(image_name("resume"), "resume.png");
    }

    #[test]
    fn image_name_only_strips_the_trailing_suffix() {
        assert_eq!(image_name("my.pdf.backup.pdf"), "my.pdf.backup.png");
    }

    #[test]
    fn data_uri_carries_media_type_and_base64_payload() {
        let artifact = FileArtifact {
            name: "resume.png".into(),
            media_type: PNG_MEDIA_TYPE.into(),
            bytes: vec![1, 2, 3],
        };
        let uri = data_uri(&artifact);
        assert!(uri.starts_with("data:image/png;base64,"));
        let b64 = uri.rsplit(',').next().unwrap();
        assert_eq!(STANDARD.decode(b64).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn conversion_result_helpers() {
        let ok = ConversionResult::success(
            FileArtifact {
                name: "a.png".into(),
                media_type: PNG_MEDIA_TYPE.into(),
                bytes: vec![0],
            },
            "data:image/png;base64,AA==".into(),
        );
        assert!(ok.is_success());
        assert!(ok.error_message().is_none());

        let bad = ConversionResult::failure(RasterizeError::Parse {
            detail: "garbage".into(),
        });
        assert!(!bad.is_success());
        assert!(bad.preview_uri.is_empty());
        assert!(bad.error_message().unwrap().contains("garbage"));
    }
}

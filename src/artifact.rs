//! Source documents and binary artifacts.
//!
//! A [`SourceDocument`] is read fully into memory exactly once, at
//! construction, and never mutated afterwards — pdfium opens documents from
//! a byte slice, so nothing downstream touches the filesystem again. The
//! path and URL constructors validate the `%PDF` magic bytes up front so
//! callers get a meaningful error instead of a parse failure deep inside
//! the conversion stage.

use crate::error::SubmitError;
use std::path::Path;
use tracing::{debug, info};

/// Media type of résumé inputs.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Media type of converted preview images.
pub const PNG_MEDIA_TYPE: &str = "image/png";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// An immutable caller-supplied document: filename, declared media type,
/// and the full binary contents.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Wrap in-memory bytes as a source document.
    ///
    /// No validation happens here; malformed bytes surface as a parse
    /// failure when the document is rasterized.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a local PDF file, validating existence, readability, and magic
    /// bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SubmitError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "resume.pdf".to_string());

        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => SubmitError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => SubmitError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        check_magic(&name, &bytes)?;
        debug!("Read resume from {}: {} bytes", path.display(), bytes.len());
        Ok(Self::from_bytes(name, PDF_MEDIA_TYPE, bytes))
    }

    /// Download a PDF from an HTTP/HTTPS URL into memory.
    pub async fn from_url(url: &str, timeout_secs: u64) -> Result<Self, SubmitError> {
        info!("Downloading resume from: {}", url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SubmitError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SubmitError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                SubmitError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(SubmitError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let name = filename_from_url(url);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SubmitError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        check_magic(&name, &bytes)?;
        info!("Downloaded {} ({} bytes)", name, bytes.len());
        Ok(Self::from_bytes(name, PDF_MEDIA_TYPE, bytes))
    }

    /// View this document as an uploadable artifact.
    pub fn as_artifact(&self) -> FileArtifact {
        FileArtifact {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
            bytes: self.bytes.clone(),
        }
    }
}

/// A binary blob produced or consumed by the pipeline, plus metadata.
#[derive(Debug, Clone)]
pub struct FileArtifact {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a user-supplied path or URL into a [`SourceDocument`].
pub async fn resolve_source(input: &str, timeout_secs: u64) -> Result<SourceDocument, SubmitError> {
    if is_url(input) {
        SourceDocument::from_url(input, timeout_secs).await
    } else {
        SourceDocument::from_path(input).await
    }
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), SubmitError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(SubmitError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

/// Extract a reasonable filename from the URL path, defaulting to
/// `resume.pdf` when the URL carries none.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "resume.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/resume.pdf"));
        assert!(is_url("http://example.com/resume.pdf"));
        assert!(!is_url("/tmp/resume.pdf"));
        assert!(!is_url("resume.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_prefers_last_segment() {
        assert_eq!(
            filename_from_url("https://example.com/files/cv.pdf"),
            "cv.pdf"
        );
        assert_eq!(filename_from_url("https://example.com/"), "resume.pdf");
        assert_eq!(filename_from_url("not a url"), "resume.pdf");
    }

    #[test]
    fn magic_check_rejects_non_pdf() {
        let err = check_magic("resume.pdf", b"PK\x03\x04rest").unwrap_err();
        assert!(matches!(err, SubmitError::NotAPdf { .. }));
    }

    #[test]
    fn magic_check_accepts_pdf_and_short_inputs() {
        assert!(check_magic("a.pdf", b"%PDF-1.7\n").is_ok());
        // Too short to carry magic bytes; left for the parser to reject.
        assert!(check_magic("a.pdf", b"%P").is_ok());
    }

    #[tokio::test]
    async fn from_path_maps_missing_file() {
        let err = SourceDocument::from_path("/definitely/not/a/real/file.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn from_path_reads_name_and_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("My Resume.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").expect("write");

        let doc = SourceDocument::from_path(&path).await.expect("read");
        assert_eq!(doc.name, "My Resume.pdf");
        assert_eq!(doc.media_type, PDF_MEDIA_TYPE);
        assert_eq!(doc.bytes, b"%PDF-1.4 fake");
    }
}

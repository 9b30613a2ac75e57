//! AI feedback collaborator backed by a vision LLM.
//!
//! The stored résumé is read back, its first page rasterised to a PNG, and
//! the image attached to a chat request whose system message carries the
//! critique instructions. The model reads the page as a reviewer would —
//! layout, typography, and section structure all inform the critique, which
//! plain text extraction would throw away.
//!
//! ## Message Layout
//!
//! 1. **System message** — the critique instructions (job context + required
//!    JSON shape)
//! 2. **User message** — the page PNG as a base64 image attachment (empty
//!    text; vision APIs require a user turn, and the image carries all the
//!    actual content)

use crate::artifact::{SourceDocument, PDF_MEDIA_TYPE};
use crate::config::SubmissionConfig;
use crate::error::SubmitError;
use crate::feedback::FeedbackResponse;
use crate::rasterize;
use crate::services::{FeedbackService, ServiceError, ServiceResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// [`FeedbackService`] implementation over `edgequake-llm` providers.
pub struct VisionFeedback {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl VisionFeedback {
    /// Wrap a pre-constructed provider with default sampling settings.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    /// Resolve a provider from the config, most-specific to least-specific:
    ///
    /// 1. Pre-built provider (`config.provider`) — used as-is.
    /// 2. Named provider + model (`config.provider_name`) — the factory
    ///    reads the matching API key from the environment.
    /// 3. `RESUMELENS_LLM_PROVIDER` + `RESUMELENS_MODEL` env pair.
    /// 4. Full auto-detection (`ProviderFactory::from_env`).
    pub fn from_config(config: &SubmissionConfig) -> Result<Self, SubmitError> {
        let provider = resolve_provider(config)?;
        Ok(Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl FeedbackService for VisionFeedback {
    async fn feedback(
        &self,
        document_path: &str,
        instructions: &str,
    ) -> ServiceResult<FeedbackResponse> {
        let bytes = tokio::fs::read(document_path)
            .await
            .map_err(|e| ServiceError::new(format!("read {document_path}: {e}")))?;

        let image = page_image(document_path, bytes).await?;

        let messages = vec![
            ChatMessage::system(instructions),
            ChatMessage::user_with_images("", vec![image]),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ServiceError::new(e.to_string()))?;

        debug!(
            "Critique received: {} prompt tokens, {} completion tokens",
            response.prompt_tokens, response.completion_tokens
        );

        Ok(FeedbackResponse::from_text(response.content))
    }
}

/// Turn the stored document into a vision attachment.
///
/// PDFs are rasterised (first page, same converter the pipeline uses);
/// anything else is assumed to already be an image and passed through.
async fn page_image(document_path: &str, bytes: Vec<u8>) -> ServiceResult<ImageData> {
    if bytes.starts_with(b"%PDF") {
        let name = Path::new(document_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "resume.pdf".to_string());
        let doc = SourceDocument::from_bytes(name, PDF_MEDIA_TYPE, bytes);
        let conversion = rasterize::rasterize_first_page(&doc).await;
        match conversion.image {
            Some(artifact) => {
                Ok(ImageData::new(STANDARD.encode(&artifact.bytes), "image/png")
                    .with_detail("high"))
            }
            None => Err(ServiceError::new(
                conversion
                    .error_message()
                    .unwrap_or_else(|| "could not rasterise the stored document".to_string()),
            )),
        }
    } else {
        let mime = mime_for(document_path);
        Ok(ImageData::new(STANDARD.encode(&bytes), mime).with_detail("high"))
    }
}

fn mime_for(path: &str) -> &'static str {
    match Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, SubmitError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SubmitError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn resolve_provider(config: &SubmissionConfig) -> Result<Arc<dyn LLMProvider>, SubmitError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("RESUMELENS_LLM_PROVIDER"),
        std::env::var("RESUMELENS_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    // Prefer OpenAI when an OpenAI key is present, so users holding several
    // provider keys get a deterministic default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_vision_provider("openai", model);
        }
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SubmitError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from the environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or name a provider explicitly.\n\
                Error: {e}"
            ),
        })?;

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_for_recognises_jpegs() {
        assert_eq!(mime_for("/store/photo.JPG"), "image/jpeg");
        assert_eq!(mime_for("/store/photo.jpeg"), "image/jpeg");
        assert_eq!(mime_for("/store/page.png"), "image/png");
        assert_eq!(mime_for("/store/unknown"), "image/png");
    }
}

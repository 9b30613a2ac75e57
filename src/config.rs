//! Configuration for submission runs.
//!
//! Every knob lives in one [`SubmissionConfig`], built via its validating
//! builder. Callers set only what they care about and rely on documented
//! defaults for the rest; the struct stays cheap to clone and share across
//! submissions.

use crate::error::SubmitError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for the submission pipeline and the AI feedback service.
///
/// Built via [`SubmissionConfig::builder()`] or [`SubmissionConfig::default()`].
///
/// # Example
/// ```rust
/// use resumelens::SubmissionConfig;
///
/// let config = SubmissionConfig::builder()
///     .model("gpt-4.1-mini")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SubmissionConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, the provider default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected from
    /// the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the critique completion. Default: 0.2.
    ///
    /// Low temperature keeps scores and tips grounded in what is actually
    /// on the page; higher values make the critique inventive but flaky.
    pub temperature: f32,

    /// Maximum tokens the model may generate for one critique. Default: 4096.
    ///
    /// The structured critique runs 1–2k tokens for a dense résumé; 4096
    /// leaves headroom without letting a runaway completion get expensive.
    pub max_tokens: usize,

    /// Custom critique instructions. If None, instructions are built from
    /// the job title and description via [`crate::prompts::prepare_instructions`].
    pub instructions: Option<String>,

    /// Key prefix for persisted records (`<prefix>:<id>`). Default: "resume".
    pub key_prefix: String,

    /// Optional deadline, in seconds, applied to each storage / key-value /
    /// AI collaborator call. Default: None.
    ///
    /// The reference flow has no timeouts, so a stalled collaborator stalls
    /// the submission; set this to bound each remote call. A timeout
    /// surfaces as the failing stage's error.
    pub collaborator_timeout_secs: Option<u64>,

    /// Download timeout for URL-supplied résumés, in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            instructions: None,
            key_prefix: "resume".to_string(),
            collaborator_timeout_secs: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for SubmissionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("instructions", &self.instructions.as_ref().map(|_| "<custom>"))
            .field("key_prefix", &self.key_prefix)
            .field("collaborator_timeout_secs", &self.collaborator_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl SubmissionConfig {
    /// Create a new builder for `SubmissionConfig`.
    pub fn builder() -> SubmissionConfigBuilder {
        SubmissionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SubmissionConfig`].
#[derive(Debug)]
pub struct SubmissionConfigBuilder {
    config: SubmissionConfig,
}

impl SubmissionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.instructions = Some(instructions.into());
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn collaborator_timeout_secs(mut self, secs: u64) -> Self {
        self.config.collaborator_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SubmissionConfig, SubmitError> {
        let c = &self.config;
        if c.key_prefix.is_empty() {
            return Err(SubmitError::InvalidConfig(
                "key_prefix must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(SubmitError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let c = SubmissionConfig::default();
        assert_eq!(c.key_prefix, "resume");
        assert_eq!(c.max_tokens, 4096);
        assert!(c.collaborator_timeout_secs.is_none());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = SubmissionConfig::builder()
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_empty_key_prefix() {
        assert!(SubmissionConfig::builder().key_prefix("").build().is_err());
    }

    #[test]
    fn builder_floors_collaborator_timeout() {
        let c = SubmissionConfig::builder()
            .collaborator_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.collaborator_timeout_secs, Some(1));
    }

    #[test]
    fn debug_does_not_dump_the_provider() {
        let c = SubmissionConfig::default();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("key_prefix"));
    }
}

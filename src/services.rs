//! Collaborator contracts consumed by the submission pipeline.
//!
//! The pipeline orchestrates three external services it does not implement:
//! object storage, a key-value store, and an AI feedback service. Each is an
//! object-safe async trait so hosts can plug in their own backends and tests
//! can substitute recording mocks. Reference implementations live in
//! [`local`] (filesystem) and [`vision`] (edgequake-llm).

use crate::artifact::FileArtifact;
use crate::feedback::FeedbackResponse;
use async_trait::async_trait;
use thiserror::Error;

pub mod local;
pub mod vision;

/// Failure reported by a collaborator. Carries only a human-readable
/// detail; the pipeline wraps it in the failing stage's error.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Location of a stored artifact, as reported by the storage collaborator.
///
/// An empty `path` is treated by the pipeline as an upload failure.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub path: String,
}

/// Remote object storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the given artifacts and return where the first one lives.
    async fn upload(&self, files: &[FileArtifact]) -> ServiceResult<StoredObject>;
}

/// Remote key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> ServiceResult<()>;
}

/// Remote AI feedback service.
#[async_trait]
pub trait FeedbackService: Send + Sync {
    /// Critique the stored document at `document_path` following
    /// `instructions`.
    async fn feedback(
        &self,
        document_path: &str,
        instructions: &str,
    ) -> ServiceResult<FeedbackResponse>;
}

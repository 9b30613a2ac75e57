//! Filesystem-backed reference collaborators.
//!
//! [`DirStorage`] and [`JsonDirKv`] give the pipeline a complete local
//! backend: artifacts land under one directory, records under another, and
//! everything is inspectable with `ls` and `cat`. The CLI wires these up
//! under `--data-dir`; hosts with real remote services implement the traits
//! themselves.

use crate::artifact::FileArtifact;
use crate::services::{KvStore, ObjectStorage, ServiceError, ServiceResult, StoredObject};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Object storage rooted at a local directory.
///
/// Stored names are prefixed with a fresh UUID so repeated uploads of
/// `resume.pdf` never collide.
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStorage for DirStorage {
    async fn upload(&self, files: &[FileArtifact]) -> ServiceResult<StoredObject> {
        if files.is_empty() {
            return Err(ServiceError::new("no files to upload"));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ServiceError::new(format!("create {}: {e}", self.root.display())))?;

        let mut first_path: Option<String> = None;
        for file in files {
            let stored_name = format!("{}-{}", Uuid::new_v4(), sanitize(&file.name));
            let path = self.root.join(&stored_name);
            tokio::fs::write(&path, &file.bytes)
                .await
                .map_err(|e| ServiceError::new(format!("write {}: {e}", path.display())))?;
            debug!("Stored '{}' as {}", file.name, path.display());
            if first_path.is_none() {
                first_path = Some(path.to_string_lossy().to_string());
            }
        }

        Ok(StoredObject {
            // Non-empty by construction: files is non-empty and every write
            // either succeeded or returned above.
            path: first_path.unwrap_or_default(),
        })
    }
}

/// Key-value store persisting one JSON file per key.
pub struct JsonDirKv {
    root: PathBuf,
}

impl JsonDirKv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where a given key is (or would be) persisted.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize(key)))
    }
}

#[async_trait]
impl KvStore for JsonDirKv {
    async fn set(&self, key: &str, value: &str) -> ServiceResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ServiceError::new(format!("create {}: {e}", self.root.display())))?;

        let path = self.path_for(key);

        // Atomic write: temp file + rename, so a crash mid-write never
        // leaves a half-written record under the real key.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value)
            .await
            .map_err(|e| ServiceError::new(format!("write {}: {e}", tmp_path.display())))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ServiceError::new(format!("rename to {}: {e}", path.display())))?;

        debug!("Persisted key '{}' → {}", key, path.display());
        Ok(())
    }
}

/// Keep stored names flat and filesystem-safe.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::PDF_MEDIA_TYPE;

    fn artifact(name: &str, bytes: &[u8]) -> FileArtifact {
        FileArtifact {
            name: name.into(),
            media_type: PDF_MEDIA_TYPE.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn sanitize_flattens_awkward_names() {
        assert_eq!(sanitize("My Resume (final).pdf"), "My-Resume--final-.pdf");
        assert_eq!(sanitize("resume:1"), "resume-1");
        assert_eq!(sanitize("ok-name_2.pdf"), "ok-name_2.pdf");
    }

    #[tokio::test]
    async fn upload_stores_bytes_and_returns_a_real_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path());

        let stored = storage
            .upload(&[artifact("resume.pdf", b"%PDF-1.4")])
            .await
            .expect("upload succeeds");

        assert!(!stored.path.is_empty());
        assert!(stored.path.ends_with("resume.pdf"));
        let on_disk = std::fs::read(&stored.path).unwrap();
        assert_eq!(on_disk, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn upload_of_two_files_returns_the_first_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path());

        let stored = storage
            .upload(&[artifact("a.pdf", b"%PDF a"), artifact("b.png", b"png b")])
            .await
            .unwrap();
        assert!(stored.path.ends_with("a.pdf"));

        // Both files landed.
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn upload_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path());
        assert!(storage.upload(&[]).await.is_err());
    }

    #[tokio::test]
    async fn kv_set_writes_and_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let kv = JsonDirKv::new(dir.path());

        kv.set("resume:abc", r#"{"feedback":null}"#).await.unwrap();
        let path = kv.path_for("resume:abc");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"feedback":null}"#
        );

        // Second write to the same key overwrites the first.
        kv.set("resume:abc", r#"{"feedback":{"overallScore":9}}"#)
            .await
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("overallScore"));

        // No stray temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }
}

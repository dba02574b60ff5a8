use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Name used when nothing of the uploaded filename survives sanitizing.
const FALLBACK_NAME: &str = "upload";

/// Keeps post images on disk.
///
/// Each image is a flat file at `{dir}/{reference}`, where the reference is a
/// random UUID joined to a sanitized copy of the client's filename.
pub struct Storage {
    dir: PathBuf,
    max_bytes: usize,
}

impl Storage {
    pub async fn new(dir: PathBuf, max_bytes: usize) -> std::io::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir, max_bytes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Path of the file backing `reference`.
    pub fn file_path(&self, reference: &str) -> PathBuf {
        self.dir.join(reference)
    }

    /// Write `bytes` under a fresh sanitized reference and return it.
    pub async fn store(&self, raw_filename: &str, bytes: &[u8]) -> Result<String, ApiError> {
        self.check_upload(raw_filename, bytes)?;

        let reference = format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(raw_filename));
        let path = self.file_path(&reference);

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| ApiError::Storage(format!("create {}: {}", path.display(), e)))?;
        file.write_all(bytes)
            .await
            .map_err(|e| ApiError::Storage(format!("write {}: {}", path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| ApiError::Storage(format!("flush {}: {}", path.display(), e)))?;

        info!("Stored upload {} ({} bytes)", reference, bytes.len());
        Ok(reference)
    }

    /// Drop the old image, then store the new one. A missing old file is fine.
    pub async fn replace(
        &self,
        old_reference: Option<&str>,
        raw_filename: &str,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        // Reject a bad upload before touching the existing image.
        self.check_upload(raw_filename, bytes)?;
        self.release(old_reference).await;
        self.store(raw_filename, bytes).await
    }

    /// Delete the backing file if there is one. Never fails.
    pub async fn release(&self, reference: Option<&str>) {
        let Some(reference) = reference else {
            return;
        };

        if !is_bare_name(reference) {
            warn!("Refusing to release suspicious image reference {:?}", reference);
            return;
        }

        let path = self.file_path(reference);
        match fs::remove_file(&path).await {
            Ok(()) => info!("Deleted upload {}", reference),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already gone", reference);
            }
            Err(e) => warn!("Failed to delete upload {}: {}", reference, e),
        }
    }

    fn check_upload(&self, raw_filename: &str, bytes: &[u8]) -> Result<(), ApiError> {
        if raw_filename.trim().is_empty() {
            return Err(ApiError::validation("Uploaded file has no filename"));
        }
        if bytes.len() > self.max_bytes {
            return Err(ApiError::validation(format!(
                "Uploaded file exceeds {} bytes",
                self.max_bytes
            )));
        }
        Ok(())
    }
}

/// Reduce a client-supplied filename to something safe to join onto the upload
/// directory: last path component only, `[A-Za-z0-9._-]`, no leading dots.
pub fn sanitize_filename(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_bare_name(reference: &str) -> bool {
    !reference.is_empty()
        && !reference.starts_with('.')
        && !reference.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("uploads"), 1024).await.unwrap();
        (dir, storage)
    }

    #[test]
    fn sanitize_strips_traversal() {
        let name = sanitize_filename("../../etc/passwd");
        assert_eq!(name, "passwd");

        let name = sanitize_filename("..\\..\\windows\\win.ini");
        assert_eq!(name, "win.ini");

        let name = sanitize_filename("..");
        assert_eq!(name, FALLBACK_NAME);
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("ünï.jpg"), "_n_.jpg");
        assert_eq!(sanitize_filename("dir/"), FALLBACK_NAME);
    }

    #[tokio::test]
    async fn store_keeps_file_inside_upload_dir() {
        let (_tmp, storage) = storage().await;

        let reference = storage.store("../../etc/passwd", b"root:x").await.unwrap();
        assert!(!reference.contains(".."));
        assert!(!reference.contains('/'));
        assert!(reference.ends_with("_passwd"));

        let path = storage.file_path(&reference);
        assert_eq!(path.parent().unwrap(), storage.dir());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"root:x");
    }

    #[tokio::test]
    async fn same_name_gets_distinct_references() {
        let (_tmp, storage) = storage().await;
        let a = storage.store("cat.png", b"a").await.unwrap();
        let b = storage.store("cat.png", b"b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn store_rejects_empty_name_and_oversize() {
        let (_tmp, storage) = storage().await;

        let err = storage.store("", b"data").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let big = vec![0u8; 2048];
        let err = storage.store("big.bin", &big).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn replace_removes_old_file() {
        let (_tmp, storage) = storage().await;
        let old = storage.store("old.png", b"old").await.unwrap();

        let new = storage.replace(Some(&old), "new.png", b"new").await.unwrap();
        assert!(!storage.file_path(&old).exists());
        assert!(storage.file_path(&new).exists());
    }

    #[tokio::test]
    async fn replace_tolerates_missing_old_file() {
        let (_tmp, storage) = storage().await;
        let new = storage
            .replace(Some("gone_already.png"), "new.png", b"new")
            .await
            .unwrap();
        assert!(storage.file_path(&new).exists());
    }

    #[tokio::test]
    async fn replace_with_bad_upload_keeps_old_file() {
        let (_tmp, storage) = storage().await;
        let old = storage.store("old.png", b"old").await.unwrap();

        assert!(storage.replace(Some(&old), "", b"new").await.is_err());
        assert!(storage.file_path(&old).exists());
    }

    #[tokio::test]
    async fn release_is_never_fatal() {
        let (tmp, storage) = storage().await;
        storage.release(None).await;
        storage.release(Some("missing.png")).await;

        // A reference that tries to escape the directory is ignored.
        let outside = tmp.path().join("outside.txt");
        std::fs::write(&outside, b"keep").unwrap();
        storage.release(Some("../outside.txt")).await;
        assert!(outside.exists());

        let reference = storage.store("pic.png", b"x").await.unwrap();
        storage.release(Some(&reference)).await;
        assert!(!storage.file_path(&reference).exists());
    }
}

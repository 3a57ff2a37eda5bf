//! Object storage for user uploads.
//!
//! Objects live on disk at `{root}/{bucket}/{path}` and are publicly served under
//! `{public_url}/storage/{bucket}/{path}`.

use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// Bucket holding profile pictures, keyed by `{user_id}/...`.
pub const AVATAR_BUCKET: &str = "avatars";

/// Largest object accepted by [`Storage::upload`].
pub const MAX_OBJECT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    public_url: String,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an object, replacing any existing one, and return its public URL.
    pub async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("Upload is empty".to_string()));
        }
        if bytes.len() > MAX_OBJECT_BYTES {
            return Err(AppError::Validation(format!(
                "Upload exceeds {} bytes",
                MAX_OBJECT_BYTES
            )));
        }

        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::info!(bucket, path, size = bytes.len(), "Stored object");
        self.public_url(bucket, path)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> Result<String, AppError> {
        validate_segment(bucket)?;
        let segments = split_path(path)?;
        Ok(format!(
            "{}/storage/{}/{}",
            self.public_url,
            bucket,
            segments.join("/")
        ))
    }

    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf, AppError> {
        validate_segment(bucket)?;
        let mut target = self.root.join(bucket);
        for segment in split_path(path)? {
            target.push(segment);
        }
        Ok(target)
    }
}

/// First path segment of an object key, used to scope uploads to their owner.
pub fn owner_segment(path: &str) -> Option<&str> {
    path.trim_start_matches('/').split('/').next().filter(|s| !s.is_empty())
}

fn split_path(path: &str) -> Result<Vec<&str>, AppError> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    if segments.iter().all(|s| s.is_empty()) {
        return Err(AppError::Validation("Object path is empty".to_string()));
    }
    for segment in &segments {
        validate_segment(segment)?;
    }
    Ok(segments)
}

fn validate_segment(segment: &str) -> Result<(), AppError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('\\')
        || segment.contains('\0');
    if bad {
        return Err(AppError::Validation(format!(
            "Invalid object path segment: {:?}",
            segment
        )));
    }
    Ok(())
}

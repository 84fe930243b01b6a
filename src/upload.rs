//! Local storage for uploaded post images.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use crate::error::ServiceError;

/// Directory uploads are written to; the converter later reads from it.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedUpload {
    /// Stored name, relative to the upload directory.
    pub file_name: String,
    /// Full path of the stored file.
    pub location: String,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` as `{uuid}-{name}` so equal client file names never collide.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<SavedUpload, ServiceError> {
        let clean = sanitize_file_name(original_name).ok_or_else(|| {
            ServiceError::Validation(format!("invalid image file name {original_name:?}"))
        })?;
        let file_name = format!("{}-{}", Uuid::new_v4().simple(), clean);

        fs::create_dir_all(&self.root)
            .await
            .map_err(ServiceError::Upload)?;
        let path = self.root.join(&file_name);
        fs::write(&path, bytes).await.map_err(ServiceError::Upload)?;

        Ok(SavedUpload {
            file_name,
            location: path.to_string_lossy().into_owned(),
        })
    }

    /// Best-effort removal of an upload whose post could not be stored.
    pub async fn discard(&self, saved: &SavedUpload) {
        if let Err(err) = fs::remove_file(&saved.location).await {
            warn!(?err, location = %saved.location, "failed to remove orphaned upload");
        }
    }
}

/// Keep only the last path component of a client-supplied name.
fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(|c: char| c == '/' || c == '\\').next()?.trim();
    if last.is_empty() || last.chars().all(|c| c == '.') {
        return None;
    }
    Some(last.to_string())
}

//! Upload policy: size limit, extension allow-list, UUID naming
//!
//! File disimpan sebagai `<uuid><ext asli>` di direktori upload, lalu
//! dilayani kembali di `/uploads/<nama>`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{ALLOWED_UPLOAD_EXTENSIONS, MAX_UPLOAD_BYTES, UPLOAD_URL_PREFIX};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    /// Public URL, `/uploads/<stored name>`
    pub url: String,
    /// Name the client sent
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadPolicy {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Validate size and extension; returns the extension as sent (with dot)
    pub fn check(&self, original_name: &str, size: usize) -> AppResult<String> {
        if size > self.max_bytes {
            return Err(AppError::upload_rejected("File size exceeds 10MB limit"));
        }

        let ext = extension_of(original_name).ok_or_else(|| AppError::upload_rejected("File type not allowed"))?;
        let lower = ext.to_ascii_lowercase();
        if !ALLOWED_UPLOAD_EXTENSIONS.contains(&lower.as_str()) {
            return Err(AppError::upload_rejected("File type not allowed"));
        }

        Ok(ext)
    }

    /// Check, then write the file under a fresh UUID name
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        let ext = self.check(original_name, bytes.len())?;
        let stored_name = format!("{}{}", Uuid::new_v4(), ext);

        self.write(&stored_name, bytes).await.map_err(|e| {
            error!(error = %e, dir = %self.dir.display(), "Upload write failed");
            AppError::with_source(ErrorCode::UploadFailed, "Failed to upload file", e)
        })?;

        info!(file = %stored_name, bytes = bytes.len(), "📎 File uploaded");
        Ok(StoredFile {
            url: format!("{UPLOAD_URL_PREFIX}{stored_name}"),
            filename: original_name.to_string(),
        })
    }

    async fn write(&self, stored_name: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(stored_name), bytes).await
    }
}

/// `.ext` of the final path component, `None` for dotfiles and bare names
fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
}

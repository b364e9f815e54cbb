//! Local filesystem storage for uploaded submission files.

use chrono::Utc;
use domain::errors::StoreError;
use domain::models::{FileUpload, StoredFile};
use domain::store::{upload_path, FileStorage};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Writes uploads below `root` at `form_submissions/YYYY/MM/DD/<id>_<name>`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a storage-relative path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

/// Client-declared type, else a guess from the file extension.
fn content_type_for(upload: &FileUpload) -> String {
    upload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(&upload.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Backend(format!("Failed to {} {}: {}", action, path.display(), err))
}

#[async_trait::async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, upload: FileUpload) -> Result<StoredFile, StoreError> {
        let path = upload_path(Utc::now(), Uuid::new_v4(), &upload.name);
        let target = self.resolve(&path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, e))?;
        }
        tokio::fs::write(&target, &upload.bytes)
            .await
            .map_err(|e| io_error("write", &target, e))?;

        debug!(path = %path, size = upload.bytes.len(), "Stored upload");

        Ok(StoredFile {
            content_type: content_type_for(&upload),
            size_bytes: upload.bytes.len() as i64,
            sha256: shared::crypto::sha256_hex(&upload.bytes),
            name: upload.name,
            path,
        })
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let target = self.resolve(path);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &target, e)),
        }
    }
}

//! Text files in folders on top of the blob store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::{BlobStore, StorageError};
use crate::observability::metrics::record_backend_failure;
use crate::resilience::timeouts::with_deadline;

pub const DEFAULT_FOLDER: &str = "uploads";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub struct CloudStorageService {
    blobs: Arc<dyn BlobStore>,
    deadline: Duration,
}

impl CloudStorageService {
    pub fn new(blobs: Arc<dyn BlobStore>, deadline: Duration) -> Self {
        Self { blobs, deadline }
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        let result = with_deadline(self.deadline, fut).await;
        if result.is_err() {
            record_backend_failure("storage");
        }
        result
    }

    /// Store `content` as `folder/file_name` and return the object name.
    pub async fn upload_text_file(
        &self,
        file_name: &str,
        content: &str,
        folder: &str,
    ) -> Result<String, StorageError> {
        let path = full_path(folder, file_name);
        let name = self
            .call(self.blobs.put(&path, content.as_bytes().to_vec(), TEXT_CONTENT_TYPE))
            .await?;
        tracing::info!(path = %name, size = content.len(), "File uploaded");
        Ok(name)
    }

    /// Names of the files under `folder`, relative to it.
    pub async fn list_files(&self, folder: &str) -> Result<Vec<String>, StorageError> {
        let folder = trim_folder(folder);
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{folder}/")
        };
        let names = self.call(self.blobs.list(folder)).await?;

        let files: Vec<String> = names
            .into_iter()
            .filter_map(|name| {
                let relative = name.strip_prefix(&prefix).unwrap_or(&name);
                (!relative.is_empty()).then(|| relative.to_string())
            })
            .collect();
        tracing::info!(folder, count = files.len(), "Files listed");
        Ok(files)
    }

    /// Contents of `folder/file_name`, or `None` if there is no such file.
    pub async fn download_text_file(
        &self,
        file_name: &str,
        folder: &str,
    ) -> Result<Option<String>, StorageError> {
        let path = full_path(folder, file_name);
        let Some(bytes) = self.call(self.blobs.get(&path)).await? else {
            tracing::warn!(path = %path, "File not found");
            return Ok(None);
        };
        let content = String::from_utf8(bytes)?;
        tracing::info!(path = %path, "File downloaded");
        Ok(Some(content))
    }

    /// Delete `folder/file_name`. Returns `false` if it did not exist.
    pub async fn delete_file(&self, file_name: &str, folder: &str) -> Result<bool, StorageError> {
        let path = full_path(folder, file_name);
        let deleted = self.call(self.blobs.delete(&path)).await?;
        if deleted {
            tracing::info!(path = %path, "File deleted");
        } else {
            tracing::warn!(path = %path, "File not found for deletion");
        }
        Ok(deleted)
    }
}

/// Object paths never carry empty segments, so `docs/` and `docs` are the same folder.
fn trim_folder(folder: &str) -> &str {
    folder.trim_matches('/')
}

fn full_path(folder: &str, file_name: &str) -> String {
    match trim_folder(folder) {
        "" => file_name.to_string(),
        folder => format!("{folder}/{file_name}"),
    }
}

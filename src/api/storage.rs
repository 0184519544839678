//! Object storage endpoints.

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::error::ApiError;
use crate::http::{ApiResponse, AppState, Params};
use crate::services::DEFAULT_FOLDER;

fn default_folder() -> String {
    DEFAULT_FOLDER.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParams {
    pub file_name: String,
    pub content: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

#[derive(Debug, Deserialize)]
pub struct FolderParams {
    #[serde(default = "default_folder")]
    pub folder: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileParams {
    pub file_name: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

pub async fn upload(
    State(state): State<AppState>,
    Params(params): Params<UploadParams>,
) -> Result<ApiResponse<Value>, ApiError> {
    const CONTEXT: &str = "Failed to upload file";
    tracing::info!(file = %params.file_name, folder = %params.folder, "Upload requested");

    let path = state
        .storage
        .upload_text_file(&params.file_name, &params.content, &params.folder)
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;
    let size = params.content.len();

    let mut metadata = Map::new();
    metadata.insert("file_name".into(), json!(params.file_name));
    metadata.insert("file_size".into(), json!(size));
    metadata.insert("folder".into(), json!(params.folder));
    state
        .firestore
        .save_event("storage_upload", "File uploaded to cloud storage", metadata)
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;

    Ok(ApiResponse::success(
        json!({
            "fileName": params.file_name,
            "path": path,
            "folder": params.folder,
            "size": size,
            "timestamp": Utc::now(),
        }),
        "File uploaded successfully",
    ))
}

pub async fn list(
    State(state): State<AppState>,
    Params(params): Params<FolderParams>,
) -> Result<ApiResponse<Value>, ApiError> {
    let files = state
        .storage
        .list_files(&params.folder)
        .await
        .map_err(|e| ApiError::upstream("Failed to list files", e))?;

    Ok(ApiResponse::success(
        json!({
            "folder": params.folder,
            "count": files.len(),
            "files": files,
            "timestamp": Utc::now(),
        }),
        "Files listed successfully",
    ))
}

pub async fn download(
    State(state): State<AppState>,
    Params(params): Params<FileParams>,
) -> Result<ApiResponse<Value>, ApiError> {
    let content = state
        .storage
        .download_text_file(&params.file_name, &params.folder)
        .await
        .map_err(|e| ApiError::upstream("Failed to download file", e))?
        .ok_or_else(|| {
            ApiError::NotFound(format!("File not found: {}/{}", params.folder, params.file_name))
        })?;

    Ok(ApiResponse::success(
        json!({
            "fileName": params.file_name,
            "folder": params.folder,
            "size": content.len(),
            "content": content,
        }),
        "File downloaded successfully",
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Params(params): Params<FileParams>,
) -> Result<ApiResponse<Value>, ApiError> {
    let deleted = state
        .storage
        .delete_file(&params.file_name, &params.folder)
        .await
        .map_err(|e| ApiError::upstream("Failed to delete file", e))?;

    let message = if deleted {
        "File deleted successfully"
    } else {
        "File did not exist"
    };
    Ok(ApiResponse::success(
        json!({
            "fileName": params.file_name,
            "folder": params.folder,
            "deleted": deleted,
        }),
        message,
    ))
}

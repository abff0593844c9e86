use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

use super::storage_error;
use crate::api::response::{ApiError, AppQuery, MessageBody};
use crate::api::session::AdminGate;
use crate::storage::models::{AssetRecord, NewAsset};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default)]
    pub category: Option<String>,
}

struct FilePart {
    name: Option<String>,
    data: Bytes,
}

impl FilePart {
    /// What a browser submits for a file input left empty.
    fn is_blank(&self) -> bool {
        self.data.is_empty() && self.name.as_deref().map_or(true, str::is_empty)
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    gate: AdminGate,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AssetRecord>), ApiError> {
    let mut file: Option<FilePart> = None;
    let mut filename: Option<String> = None;
    let mut description: Option<String> = None;
    let mut category: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().map(|s| s.to_string());
                let data = field.bytes().await.map_err(multipart_error)?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                file = Some(FilePart { name, data });
            }
            "filename" => filename = Some(text_field(field, "filename").await?),
            "description" => description = Some(text_field(field, "description").await?),
            "category" => category = Some(text_field(field, "category").await?),
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file = file
        .filter(|f| !f.is_blank())
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let byte_size = file.data.len();

    let record = state
        .assets
        .create(NewAsset {
            filename: filename.unwrap_or_default(),
            description: description.unwrap_or_default(),
            category: category.unwrap_or_default(),
            original_filename: file.name,
            data: file.data,
        })
        .await
        .map_err(|e| storage_error("File upload failed", e))?;

    tracing::info!(
        file_id = %record.id,
        category = %record.category,
        byte_size,
        actor = gate.actor(),
        "Uploaded file"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<Vec<AssetRecord>>, ApiError> {
    let records = state
        .assets
        .list(params.category.as_deref().filter(|c| !c.is_empty()))
        .await
        .map_err(|e| storage_error("Failed to fetch files", e))?;

    Ok(Json(records))
}

/// Route: DELETE /api/files/:id (also mounted at /api/files/ so an empty id gets a 400).
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    gate: AdminGate,
    id: Option<Path<String>>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = id.map(|Path(id)| id).unwrap_or_default();
    if id.trim().is_empty() {
        return Err(ApiError::bad_request("File ID is required"));
    }

    state
        .assets
        .delete(&id)
        .await
        .map_err(|e| storage_error("Failed to delete file", e))?;

    tracing::info!(file_id = %id, actor = gate.actor(), "Deleted file");
    Ok(MessageBody::new("File deleted successfully"))
}

// ============================================================================
// Helpers
// ============================================================================

async fn text_field(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid {name}: {}", e.body_text())))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(e.body_text())
    } else {
        ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
    }
}

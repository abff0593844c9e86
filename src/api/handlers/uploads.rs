use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;

use super::storage_error;
use crate::api::response::ApiError;
use crate::storage::StorageError;
use crate::AppState;

/// RFC 5987 `attr-char`: everything else is percent-encoded in `filename*`.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Serve blob content at its public path.
/// Route: GET /uploads/:id
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    // Only committed assets are served; the record also supplies the download name.
    let record = state.assets.get(&id).await.map_err(not_found_or)?;
    let data = state.assets.blob(&id).await.map_err(not_found_or)?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    let mime = mime_guess::from_path(&record.original_filename)
        .first()
        .or_else(|| mime_guess::from_path(&id).first())
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    headers.insert(
        header::CONTENT_TYPE,
        mime.parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(value) = inline_disposition(&record.original_filename) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Blobs never change once written.
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok(response)
}

/// `inline` with an ASCII `filename` fallback and the exact name in `filename*`.
fn inline_disposition(name: &str) -> Option<HeaderValue> {
    if name.is_empty() {
        return Some(HeaderValue::from_static("inline"));
    }

    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(name, ATTR_CHAR);

    HeaderValue::from_str(&format!(
        "inline; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .ok()
}

fn not_found_or(e: StorageError) -> ApiError {
    match e {
        StorageError::NotFound(_) => ApiError::not_found("File not found"),
        e => storage_error("Failed to retrieve file", e),
    }
}

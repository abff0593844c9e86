mod auth;
mod files;
mod meta;
mod uploads;

use crate::api::response::ApiError;
use crate::storage::StorageError;

pub use auth::{login, session};
pub use files::{delete_file, list_files, upload_file};
pub use meta::{categories, health};
pub use uploads::serve_upload;

/// Map a StorageError to an ApiError. Bad keys are the caller's fault; everything
/// else is logged and reported with the generic `message`.
fn storage_error(message: &'static str, e: StorageError) -> ApiError {
    match e {
        StorageError::InvalidKey(msg) => ApiError::bad_request(msg),
        e => {
            tracing::error!(error = %e, "{message}");
            ApiError::internal(message)
        }
    }
}

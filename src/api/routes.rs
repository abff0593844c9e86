use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Room for multipart boundaries and the text fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = (state.config.max_upload_size as usize).saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Files
        .route("/api/files", get(handlers::list_files))
        .route(
            "/api/files/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/files/", delete(handlers::delete_file))
        .route("/api/files/:id", delete(handlers::delete_file))
        // Blob content at each record's `path`
        .route("/uploads/:id", get(handlers::serve_upload))
        // Admin sessions
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/session", get(handlers::session))
        // Catalog
        .route("/api/categories", get(handlers::categories))
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

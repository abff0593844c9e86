use axum::Json;
use serde::Serialize;

use crate::storage::models::{Subject, SUBJECTS};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn categories() -> Json<&'static [Subject]> {
    Json(SUBJECTS)
}

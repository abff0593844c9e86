use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::api::session::ValidSession;
use crate::auth::{AuthError, LoginRequest, LoginResponse, Session};
use crate::AppState;

// ============================================================================
// Handlers
// ============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state.sessions.login(&req.username, &req.password) {
        Ok(issued) => {
            tracing::info!(username = %req.username, "Admin logged in");
            Ok(Json(LoginResponse {
                token: issued.token,
                username: issued.session.username,
                expires_at: issued.session.expires_at,
            }))
        }
        Err(AuthError::NotConfigured) => {
            Err(ApiError::unavailable(AuthError::NotConfigured.to_string()))
        }
        Err(e) => {
            tracing::warn!(username = %req.username, "Rejected admin login");
            Err(ApiError::unauthorized(e.to_string()))
        }
    }
}

/// Lets a client confirm its stored token is still good before rendering admin views.
pub async fn session(ValidSession(session): ValidSession) -> Json<Session> {
    Json(session)
}

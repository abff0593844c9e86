use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::auth::{AuthError, Session};
use crate::AppState;

/// A verified admin session. Rejects with 401 unless a valid bearer token is present.
pub struct ValidSession(pub Session);

/// Gate for mutating routes. Behaves like `ValidSession` when auth is required;
/// otherwise lets every request through and carries no session.
pub struct AdminGate(pub Option<Session>);

impl AdminGate {
    /// Name recorded in logs for the acting user.
    pub fn actor(&self) -> &str {
        self.0.as_ref().map_or("anonymous", |s| s.username.as_str())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn verify(parts: &Parts, state: &AppState) -> Result<Session, ApiError> {
    let token = bearer_token(&parts.headers)
        .ok_or_else(|| ApiError::unauthorized(AuthError::MissingToken.to_string()))?;

    state.sessions.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        ApiError::unauthorized(e.to_string())
    })
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for ValidSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        verify(parts, state).map(ValidSession)
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminGate {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        if !state.sessions.require_auth() {
            return Ok(AdminGate(None));
        }
        verify(parts, state).map(|s| AdminGate(Some(s)))
    }
}

//! Request authorization.
//!
//! - Admin API key: `Authorization: Bearer {admin.api_key}`
//! - Section writes: the admin API key or that section's admin token
//! - Peer calls: `sharedSecret` in the JSON body

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::error::{ConfigError, ConfigResult};
use crate::http::server::AppState;

/// Bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match bearer_token(request.headers()) {
        Some(token) if token == state.admin_key.as_ref() => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Invalid admin key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "No admin key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Allow a write to `section` with the admin key or the section's token.
pub async fn authorize_section(state: &AppState, headers: &HeaderMap, section: &str) -> ConfigResult<()> {
    let token = bearer_token(headers).ok_or(ConfigError::Unauthorized)?;
    if token == state.admin_key.as_ref() {
        return Ok(());
    }
    if state.service.is_section_token(section, token).await? {
        return Ok(());
    }
    tracing::warn!(section = %section, "Rejected section token");
    Err(ConfigError::Unauthorized)
}

pub fn require_shared_secret(state: &AppState, candidate: &str) -> ConfigResult<()> {
    if state.service.shared_secret_matches(candidate) {
        Ok(())
    } else {
        tracing::warn!("Rejected peer call with wrong shared secret");
        Err(ConfigError::Unauthorized)
    }
}

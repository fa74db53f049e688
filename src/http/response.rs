//! Error and message bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ConfigError;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Body of responses that only carry a message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self { message: message.into() })
    }
}

impl ConfigError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConfigError::NotFound(_) => StatusCode::NOT_FOUND,
            ConfigError::DuplicateName(_) => StatusCode::CONFLICT,
            ConfigError::InvalidValueType { .. } | ConfigError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ConfigError::Unauthorized => StatusCode::UNAUTHORIZED,
            ConfigError::Protected(_) => StatusCode::FORBIDDEN,
            ConfigError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ConfigError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "NOT_FOUND",
            ConfigError::DuplicateName(_) => "DUPLICATE_NAME",
            ConfigError::InvalidValueType { .. } => "INVALID_VALUE_TYPE",
            ConfigError::InvalidRequest(_) => "INVALID_REQUEST",
            ConfigError::Unauthorized => "UNAUTHORIZED",
            ConfigError::Protected(_) => "PROTECTED",
            ConfigError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            ConfigError::Store(_) => "STORE_ERROR",
        }
    }
}

impl IntoResponse for ConfigError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            ConfigError::Store(_) => tracing::error!(error_code = code, message = %message, "Request failed"),
            ConfigError::UpstreamUnavailable(_) => {
                tracing::warn!(error_code = code, message = %message, "Upstream unavailable")
            }
            _ => tracing::debug!(error_code = code, message = %message, "Client error"),
        }

        (status, Json(ErrorResponse { error: message, code })).into_response()
    }
}

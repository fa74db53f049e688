//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Validate peer and identity URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if config.environment.name.trim().is_empty() {
        errors.push(ValidationError::new("environment.name", "must not be blank"));
    }
    if config.environment.shared_secret.is_empty() {
        errors.push(ValidationError::new("environment.shared_secret", "must not be empty"));
    }
    for peer in &config.environment.peers {
        if url::Url::parse(peer).is_err() {
            errors.push(ValidationError::new("environment.peers", format!("invalid URL '{}'", peer)));
        }
    }

    if config.identity.enabled {
        if url::Url::parse(&config.identity.base_url).is_err() {
            errors.push(ValidationError::new("identity.base_url", "invalid URL"));
        }
        if config.identity.timeout_secs == 0 {
            errors.push(ValidationError::new("identity.timeout_secs", "must be > 0"));
        }
    }

    let notifications = &config.notifications;
    if notifications.interval_ms == 0 {
        errors.push(ValidationError::new("notifications.interval_ms", "must be > 0"));
    }
    if notifications.request_timeout_secs == 0 {
        errors.push(ValidationError::new("notifications.request_timeout_secs", "must be > 0"));
    }
    if notifications.retry_base_delay_ms > notifications.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "notifications.retry_base_delay_ms",
            "must not exceed retry_max_delay_ms",
        ));
    }
    if notifications.abandoned_after_secs <= notifications.request_timeout_secs {
        errors.push(ValidationError::new(
            "notifications.abandoned_after_secs",
            "must exceed request_timeout_secs",
        ));
    }

    if config.registration.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("registration.sweep_interval_secs", "must be > 0"));
    }
    if config.peers.timeout_secs == 0 {
        errors.push(ValidationError::new("peers.timeout_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

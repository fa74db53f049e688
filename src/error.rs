//! Error taxonomy for the configuration core.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::store::StoreError;
use crate::sync::peer::PeerError;

/// Errors surfaced by the section, sync and registration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Section or key does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A section with this name already exists.
    #[error("section '{0}' already exists")]
    DuplicateName(String),

    /// Structured values (objects, arrays) are rejected at the write boundary.
    #[error("value for '{key}' must be a string, number, boolean or null")]
    InvalidValueType { key: String },

    /// Required request field missing or blank.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Shared secret or admin token mismatch.
    #[error("unauthorized")]
    Unauthorized,

    /// Well-known sections can never be deleted.
    #[error("section '{0}' is protected")]
    Protected(String),

    /// Identity service or peer environment unreachable.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Persistence failure.
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl ConfigError {
    pub fn section_missing(name: &str) -> Self {
        ConfigError::NotFound(format!("section '{}' does not exist", name))
    }
}

impl From<StoreError> for ConfigError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName(name) => ConfigError::DuplicateName(name),
            other => ConfigError::Store(other),
        }
    }
}

impl From<IdentityError> for ConfigError {
    fn from(err: IdentityError) -> Self {
        ConfigError::UpstreamUnavailable(err.to_string())
    }
}

impl From<PeerError> for ConfigError {
    fn from(err: PeerError) -> Self {
        match err {
            PeerError::Rejected { status: 401, .. } => ConfigError::Unauthorized,
            other => ConfigError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Result type for core operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failures while wiring the service together.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] ConfigError),

    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("peer client: {0}")]
    Peer(#[from] PeerError),

    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
}

//! Identity service client used to mint section admin tokens.
//!
//! # Responsibilities
//! - Request a long-lived token whose identity is the section name
//! - Bound the call with a timeout
//! - Report failures without retrying (the caller decides)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::IdentityConfig;

/// Errors that can occur while minting a token.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity service disabled")]
    Disabled,

    #[error("identity request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("identity service returned HTTP {0}")]
    Status(u16),

    #[error("identity response carried no token")]
    MissingToken,
}

/// Mints admin tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn mint(&self, identity: &str) -> Result<String, IdentityError>;
}

/// Issuer used when no identity service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIssuer;

#[async_trait]
impl TokenIssuer for DisabledIssuer {
    async fn mint(&self, _identity: &str) -> Result<String, IdentityError> {
        Err(IdentityError::Disabled)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    account_id: &'a str,
    screenname: String,
    discriminator: u32,
    email: &'a str,
    days: u32,
    origin_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    authorization: Option<Authorization>,
}

#[derive(Debug, Deserialize)]
struct Authorization {
    token: Option<String>,
}

/// HTTP client for `POST {base_url}/secured/token/generate`.
#[derive(Debug, Clone)]
pub struct HttpTokenIssuer {
    client: reqwest::Client,
    config: IdentityConfig,
    deployment_id: String,
}

impl HttpTokenIssuer {
    pub fn new(config: IdentityConfig, deployment_id: impl Into<String>) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            deployment_id: deployment_id.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/secured/token/generate", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn mint(&self, identity: &str) -> Result<String, IdentityError> {
        let payload = TokenRequest {
            account_id: identity,
            screenname: format!("{} ({})", identity, self.deployment_id),
            discriminator: self.config.discriminator,
            email: &self.config.email,
            days: self.config.token_days,
            origin_key: &self.config.origin_key,
        };

        let response = self.client.post(self.endpoint()).json(&payload).send().await;
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(identity = %identity, error = %e, "Admin token failed to generate");
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!(identity = %identity, status = %status, "Admin token failed to generate");
            return Err(IdentityError::Status(status.as_u16()));
        }

        let body: TokenResponse = response.json().await?;
        let token = body
            .authorization
            .and_then(|a| a.token)
            .filter(|t| !t.is_empty())
            .ok_or(IdentityError::MissingToken)?;

        tracing::info!(identity = %identity, "Admin token generated");
        Ok(token)
    }
}

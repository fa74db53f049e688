//! HTTP client for peer environments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::model::Section;
use crate::sync::merge::{parse_sections, MergeOutcome};

/// Errors talking to another environment.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("peer returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffRequest<'a> {
    shared_secret: &'a str,
    environments: [&'a str; 0],
}

#[derive(Debug, Deserialize)]
struct SectionsResponse {
    #[serde(default)]
    sections: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest<'a> {
    shared_secret: &'a str,
    deployment_id: &'a str,
    sections: &'a [Section],
}

/// Talks to the `/config/diff` and `/config/import` endpoints of peers.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: reqwest::Client,
    shared_secret: String,
}

impl PeerClient {
    pub fn new(shared_secret: impl Into<String>, timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            shared_secret: shared_secret.into(),
        })
    }

    /// Fetch a peer's section snapshot. Malformed sections are dropped.
    pub async fn fetch_sections(&self, peer_url: &str) -> Result<Vec<Section>, PeerError> {
        let response = self
            .client
            .patch(endpoint(peer_url, "config/diff"))
            .json(&DiffRequest {
                shared_secret: &self.shared_secret,
                environments: [],
            })
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: SectionsResponse = response.json().await?;
        Ok(parse_sections(body.sections))
    }

    /// Push sections into a peer's import endpoint.
    pub async fn push_import(
        &self,
        peer_url: &str,
        deployment_id: &str,
        sections: &[Section],
    ) -> Result<MergeOutcome, PeerError> {
        let response = self
            .client
            .post(endpoint(peer_url, "config/import"))
            .json(&ImportRequest {
                shared_secret: &self.shared_secret,
                deployment_id,
                sections,
            })
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PeerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PeerError::Rejected {
        status: status.as_u16(),
        body,
    })
}

//! Route handlers. Each one decodes, authorizes and delegates to
//! `ConfigService`.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ConfigResult;
use crate::http::auth::{authorize_section, require_shared_secret};
use crate::http::response::MessageResponse;
use crate::http::server::AppState;
use crate::model::RegisteredService;

#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub name: Option<String>,
    pub client: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionRequest {
    pub name: String,
    #[serde(default)]
    pub friendly_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateValueRequest {
    pub name: String,
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveValueRequest {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct SectionNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRequest {
    pub shared_secret: String,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub filter: Option<String>,
    /// Diff against `environment.peers` when `environments` is empty.
    #[serde(default)]
    pub use_configured_peers: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub shared_secret: String,
    pub deployment_id: String,
    #[serde(default)]
    pub sections: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub env_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub component: String,
    pub registration_name: String,
    pub service: RegisteredService,
}

/// `GET /config/settings`
pub async fn get_settings(
    State(state): State<AppState>,
    Query(query): Query<SettingsQuery>,
) -> ConfigResult<Response> {
    let view = state
        .service
        .client_view(query.name.as_deref(), query.client.as_deref())
        .await?;
    Ok(Json(view).into_response())
}

/// `POST /config/settings/new`
pub async fn create_section(
    State(state): State<AppState>,
    Json(body): Json<CreateSectionRequest>,
) -> ConfigResult<Response> {
    let friendly_name = if body.friendly_name.is_empty() { &body.name } else { &body.friendly_name };
    if state.service.create_section(&body.name, friendly_name).await? {
        Ok((StatusCode::CREATED, MessageResponse::new("Section created")).into_response())
    } else {
        Ok(MessageResponse::new("Section already exists").into_response())
    }
}

/// `PATCH /config/settings/update`
pub async fn update_value(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateValueRequest>,
) -> ConfigResult<Response> {
    authorize_section(&state, &headers, &body.name).await?;
    let section = state
        .service
        .update_value(&body.name, &body.key, body.value, &body.comment)
        .await?;
    Ok(Json(section).into_response())
}

/// `DELETE /config/settings/value`
pub async fn remove_value(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RemoveValueRequest>,
) -> ConfigResult<Response> {
    authorize_section(&state, &headers, &body.name).await?;
    let message = if state.service.remove_value(&body.name, &body.key).await? {
        format!("'{}.{}' removed.", body.name, body.key)
    } else {
        "No records were modified.".to_string()
    };
    Ok(MessageResponse::new(message).into_response())
}

/// `POST /config/settings/token`
pub async fn generate_token(
    State(state): State<AppState>,
    Json(body): Json<SectionNameRequest>,
) -> ConfigResult<Response> {
    let token = state.service.generate_admin_token(&body.name).await?;
    Ok(Json(json!({ "name": body.name, "token": token })).into_response())
}

/// `DELETE /config/settings`
pub async fn delete_section(
    State(state): State<AppState>,
    Json(body): Json<SectionNameRequest>,
) -> ConfigResult<Response> {
    let message = if state.service.delete_section(&body.name).await? {
        format!("Section '{}' deleted.", body.name)
    } else {
        "No records were modified.".to_string()
    };
    Ok(MessageResponse::new(message).into_response())
}

/// `PATCH /config/diff`
///
/// Without environments (and without `useConfiguredPeers`) this returns
/// the local sections, which is how peers fetch each other.
pub async fn diff(State(state): State<AppState>, Json(body): Json<DiffRequest>) -> ConfigResult<Response> {
    require_shared_secret(&state, &body.shared_secret)?;

    if body.environments.is_empty() && !body.use_configured_peers {
        let sections = state.service.export_sections().await?;
        return Ok(Json(json!({ "sections": sections })).into_response());
    }

    let environments = state
        .service
        .diff_targets(body.environments, body.use_configured_peers);
    let report = state
        .service
        .compute_diff(&environments, body.filter.as_deref())
        .await?;
    Ok(Json(report).into_response())
}

/// `POST /config/import`
pub async fn import(State(state): State<AppState>, Json(body): Json<ImportRequest>) -> ConfigResult<Response> {
    require_shared_secret(&state, &body.shared_secret)?;
    let outcome = state
        .service
        .merge_sections(body.sections, &body.deployment_id)
        .await?;
    Ok(Json(outcome).into_response())
}

/// `POST /config/export`
pub async fn export(State(state): State<AppState>, Json(body): Json<ExportRequest>) -> ConfigResult<Response> {
    let outcome = state.service.export_to(&body.env_url).await?;
    Ok(Json(outcome).into_response())
}

/// `PATCH /config/register`
pub async fn register(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> ConfigResult<Response> {
    let section = state
        .service
        .register(&body.component, &body.registration_name, body.service)
        .await?;
    Ok(Json(json!({ "settings": section })).into_response())
}

/// `GET /config/listeners`
pub async fn list_listeners(State(state): State<AppState>) -> ConfigResult<Response> {
    Ok(Json(state.service.list_listeners().await?).into_response())
}

/// `GET /admin/status`
pub async fn status(State(state): State<AppState>) -> ConfigResult<Response> {
    Ok(Json(state.service.status().await?).into_response())
}

/// `GET /admin/queue`
pub async fn queue(State(state): State<AppState>) -> ConfigResult<Response> {
    Ok(Json(state.service.queue_stats().await?).into_response())
}

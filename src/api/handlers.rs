//! Route handlers.
//!
//! Handlers translate between HTTP payloads and repository calls; all domain
//! rules live below this layer.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::error::ApiError;
use super::server::AppState;
use crate::core::error::RegistryError;
use crate::registry::model::Client;

/// Health endpoint payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub revision: String,
}

/// `GET /clients` payload.
#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<Client>,
}

/// `GET /clients/{id}/keys` payload.
#[derive(Debug, Serialize)]
pub struct ClientKeysResponse {
    pub keys: Vec<String>,
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError(RegistryError::invalid_input(rejection.body_text()))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Healthy".to_string(),
        revision: state.revision.clone(),
    })
}

pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<ClientListResponse>, ApiError> {
    let clients = state.repository.list_clients().await?;
    Ok(Json(ClientListResponse { clients }))
}

pub async fn add_client(
    State(state): State<AppState>,
    body: Result<Json<Client>, JsonRejection>,
) -> Result<Json<Client>, ApiError> {
    let Json(mut client) = body.map_err(invalid_body)?;
    client.id = Uuid::new_v4().to_string();
    let stored = state.repository.set_client(&client).await?;
    Ok(Json(stored))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    match state.repository.get_client(&client_id).await? {
        Some(client) => Ok(Json(client)),
        None => Err(ApiError(RegistryError::EntityNotFound)),
    }
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    body: Result<Json<Client>, JsonRejection>,
) -> Result<Json<Client>, ApiError> {
    let Json(update) = body.map_err(invalid_body)?;
    let Some(mut client) = state.repository.get_client(&client_id).await? else {
        return Err(ApiError(RegistryError::EntityNotFound));
    };
    client.properties = update.properties;
    let stored = state.repository.set_client(&client).await?;
    Ok(Json(stored))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.repository.get_client(&client_id).await?.is_none() {
        return Err(ApiError(RegistryError::EntityNotFound));
    }
    state.repository.remove_client(&client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_client_keys(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<ClientKeysResponse>, ApiError> {
    let keys = state.repository.client_keys(&client_id).await?;
    Ok(Json(ClientKeysResponse { keys }))
}

pub async fn add_client_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<Client>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(client) = body.map_err(invalid_body)?;
    state.repository.add_client_key(&client.id, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_client_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Client>, ApiError> {
    match state.repository.get_client_by_key(&key).await? {
        Some(client) => Ok(Json(client)),
        None => Err(ApiError(RegistryError::EntityNotFound)),
    }
}

pub async fn delete_client_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.repository.remove_client_key(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Client CRUD endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use fabtrack_common::db::models::Client;
use serde::Deserialize;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
}

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    Json(request): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("client name must not be empty".to_string()));
    }

    let client = db::clients::create_client(
        &state.db,
        request.name.trim(),
        request.contact_email.as_deref(),
        request.phone.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients
pub async fn list_clients(State(state): State<AppState>) -> ApiResult<Json<Vec<Client>>> {
    let clients = db::clients::list_clients(&state.db).await?;
    Ok(Json(clients))
}

/// GET /api/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Client>> {
    let client = db::clients::get_client(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {} not found", id)))?;

    Ok(Json(client))
}

/// DELETE /api/clients/:id
///
/// Cascades to the client's orders, items, progress events, and durations.
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let deleted = db::clients::delete_client(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("client {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
